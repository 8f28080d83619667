//! Id-based change detection and the notification collaborator.
//!
//! Genuinely-new messages are detected by set-difference of ids, never by
//! value equality: a message's display fields may change under it via
//! background author enrichment without that making it "new".

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::info;

use crate::core::models::Message;

/// External notification collaborator.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &Message);
}

/// Messages in `new_messages` whose id is absent from `old_ids`.
#[must_use]
pub fn diff_new<'a>(old_ids: &HashSet<String>, new_messages: &'a [Message]) -> Vec<&'a Message> {
    new_messages
        .iter()
        .filter(|m| !old_ids.contains(&m.id))
        .collect()
}

/// Forward fresh messages to the notifier, skipping the current user's own.
/// An unknown current user suppresses the whole batch rather than notifying
/// for self-authored messages.
pub async fn forward_new<N: Notifier + ?Sized>(
    notifier: &N,
    fresh: &[Message],
    current_user_id: Option<&str>,
) {
    let Some(me) = current_user_id else {
        if !fresh.is_empty() {
            tracing::warn!(
                "Current user unknown; suppressing {} notification(s)",
                fresh.len()
            );
        }
        return;
    };

    for message in fresh.iter().filter(|m| m.author_id != me) {
        notifier.notify(message).await;
    }
}

/// Notifier that just logs, used by the demo binary.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &Message) {
        info!(
            channel = %message.channel_id,
            author = %message.author_display_name,
            "New message: {}",
            message.text
        );
    }
}
