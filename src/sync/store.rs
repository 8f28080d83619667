use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::core::models::{Message, UserInfo};

/// Deduplicated, timestamp-descending message collection.
///
/// Exactly one entry per message id. Entries are immutable values; `update`
/// and `apply_author` store replacement values at the same position.
#[derive(Debug, Default, Clone)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    /// Drop everything and adopt `messages`, deduplicated by id and sorted
    /// newest-first.
    pub fn replace_all(&mut self, messages: Vec<Message>) {
        let mut seen = HashSet::new();
        self.messages = messages
            .into_iter()
            .filter(|m| seen.insert(m.id.clone()))
            .collect();
        self.sort();
    }

    /// Append messages whose ids are not already present, keeping descending
    /// order. Returns the ids that were actually inserted.
    pub fn merge_new(&mut self, messages: Vec<Message>) -> Vec<String> {
        let mut known: HashSet<String> = self.messages.iter().map(|m| m.id.clone()).collect();
        let mut inserted = Vec::new();

        for message in messages {
            if known.insert(message.id.clone()) {
                inserted.push(message.id.clone());
                self.messages.push(message);
            }
        }

        if !inserted.is_empty() {
            self.sort();
        }
        inserted
    }

    /// Replace the value stored under `id` with `f(old)`. Returns whether the
    /// id was present.
    pub fn update<F>(&mut self, id: &str, f: F) -> bool
    where
        F: FnOnce(Message) -> Message,
    {
        match self.messages.iter().position(|m| m.id == id) {
            Some(index) => {
                let old = self.messages[index].clone();
                self.messages[index] = f(old);
                true
            }
            None => false,
        }
    }

    /// Store resolved author metadata onto every message by `author_id`.
    /// Returns how many values were replaced.
    pub fn apply_author(&mut self, author_id: &str, info: &UserInfo) -> usize {
        let mut replaced = 0;
        for index in 0..self.messages.len() {
            if self.messages[index].author_id == author_id {
                let old = self.messages[index].clone();
                self.messages[index] = old.with_author(info);
                replaced += 1;
            }
        }
        replaced
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn ids(&self) -> HashSet<String> {
        self.messages.iter().map(|m| m.id.clone()).collect()
    }

    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.messages.iter().filter(|m| !m.is_read).count()
    }

    /// Timestamp of the newest stored message in `channel_id`, if any.
    #[must_use]
    pub fn newest_timestamp_for(&self, channel_id: &str) -> Option<DateTime<Utc>> {
        self.messages
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .map(|m| m.timestamp)
            .max()
    }

    /// Distinct author ids whose display metadata is still the placeholder.
    #[must_use]
    pub fn unresolved_authors(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.messages
            .iter()
            .filter(|m| m.author_unresolved())
            .filter(|m| seen.insert(m.author_id.clone()))
            .map(|m| m.author_id.clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn sort(&mut self) {
        self.messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }
}
