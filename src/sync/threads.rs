use crate::core::models::Message;

/// The thread rooted at `parent_id`: the parent (when still stored) followed
/// by its replies, sorted oldest-first for natural reading order. This is the
/// one place ascending order is used; the main feed is always descending.
///
/// A parent paginated out of the store yields just the children.
#[must_use]
pub fn thread_messages(messages: &[Message], parent_id: &str) -> Vec<Message> {
    let mut thread: Vec<Message> = messages
        .iter()
        .filter(|m| m.id == parent_id || m.thread_parent_id.as_deref() == Some(parent_id))
        .cloned()
        .collect();

    thread.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    thread
}
