use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single message in the merged feed.
///
/// Messages are treated as immutable values: every local "mutation" (read
/// toggle, reaction change, author resolution) produces a replacement value
/// stored at the same id, never an in-place field write. The `id` is the
/// merge/dedup key and is stable across refreshes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    pub author_id: String,
    /// Resolved lazily by background enrichment; until then this holds the
    /// raw author id as a placeholder.
    pub author_display_name: String,
    #[serde(default)]
    pub author_avatar_url: Option<String>,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Local-only annotation. Never present in upstream data.
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub thread_parent_id: Option<String>,
    #[serde(default)]
    pub is_thread_parent: bool,
    #[serde(default)]
    pub reply_count: u32,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

impl Message {
    /// Replacement value with the read flag set.
    #[must_use]
    pub fn with_read(mut self, is_read: bool) -> Self {
        self.is_read = is_read;
        self
    }

    /// Replacement value carrying resolved author metadata.
    #[must_use]
    pub fn with_author(mut self, info: &UserInfo) -> Self {
        self.author_display_name = info.display_name.clone();
        self.author_avatar_url = info.avatar_url.clone();
        self
    }

    /// Whether the author display name is still the unresolved placeholder.
    #[must_use]
    pub fn author_unresolved(&self) -> bool {
        self.author_display_name == self.author_id
    }

    /// Whether `user_id` has already reacted to this message with `name`.
    #[must_use]
    pub fn has_reaction_from(&self, name: &str, user_id: &str) -> bool {
        self.reactions
            .iter()
            .any(|r| r.name == name && r.reactor_ids.iter().any(|id| id == user_id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub title: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub name: String,
    pub count: u32,
    #[serde(default)]
    pub reactor_ids: Vec<String>,
}

/// A channel as reported by the remote source. Created or refreshed only by
/// channel-catalog sync; message operations never mutate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub is_member: bool,
}

/// One page of a channel's history, as returned by the remote source.
#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserInfo {
    pub display_name: String,
    pub avatar_url: Option<String>,
}
