//! Background author-metadata enrichment.
//!
//! One lookup per distinct unresolved author id, not one per message; cache
//! hits short-circuit. Resolution runs detached from the sync call that
//! spawned it: "sync complete" means message bodies are stored, not that
//! author names have arrived.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::state::FeedState;
use crate::core::models::UserInfo;
use crate::remote::MessageSource;

pub struct AuthorResolver<S> {
    source: Arc<S>,
    cache: Mutex<HashMap<String, UserInfo>>,
}

impl<S: MessageSource + 'static> AuthorResolver<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Spawn a detached task resolving `author_ids` and folding the results
    /// into the stored messages. Never blocks the caller.
    pub fn spawn(self: &Arc<Self>, state: Arc<Mutex<FeedState>>, author_ids: Vec<String>) {
        if author_ids.is_empty() {
            return;
        }
        let resolver = Arc::clone(self);
        tokio::spawn(async move {
            resolver.resolve_into(state, author_ids).await;
        });
    }

    async fn resolve_into(&self, state: Arc<Mutex<FeedState>>, author_ids: Vec<String>) {
        for author_id in author_ids {
            let cached = { self.cache.lock().await.get(&author_id).cloned() };

            let info = match cached {
                Some(info) => info,
                None => match self.source.get_user_info(&author_id).await {
                    Ok(info) => {
                        self.cache
                            .lock()
                            .await
                            .insert(author_id.clone(), info.clone());
                        info
                    }
                    // Left uncached so a later sync cycle retries.
                    Err(e) => {
                        warn!("Could not resolve author {}: {}", author_id, e);
                        continue;
                    }
                },
            };

            let replaced = state.lock().await.store.apply_author(&author_id, &info);
            debug!(
                "Resolved author {} as {:?} ({} message(s) updated)",
                author_id, info.display_name, replaced
            );
        }
    }
}
