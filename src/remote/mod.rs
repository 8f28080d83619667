//! The remote messaging source interface.
//!
//! The sync engine never talks to a concrete backend directly; it is handed
//! anything implementing [`MessageSource`]. Production wiring uses
//! [`client::HttpMessageSource`]; tests substitute an in-memory source.

pub mod client;

use async_trait::async_trait;

use crate::core::models::{Channel, MessagePage, UserInfo};
use crate::errors::SyncError;

/// Operations the remote messaging source must provide.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// List all channels visible to the current user, with membership.
    async fn get_channels(&self) -> Result<Vec<Channel>, SyncError>;

    /// Join a channel. Returns whether the join took effect.
    async fn join_channel(&self, channel_id: &str) -> Result<bool, SyncError>;

    /// Fetch one page of a channel's history. `cursor` of `None` means the
    /// newest page.
    async fn get_messages(
        &self,
        channel_id: &str,
        cursor: Option<&str>,
    ) -> Result<MessagePage, SyncError>;

    /// Resolve display metadata for a user.
    async fn get_user_info(&self, user_id: &str) -> Result<UserInfo, SyncError>;

    /// The id of the authenticated user.
    async fn current_user_id(&self) -> Result<String, SyncError>;

    /// Post a message, optionally as a thread reply. Returns the new
    /// message's id.
    async fn send_message(
        &self,
        text: &str,
        channel_id: &str,
        thread_parent_id: Option<&str>,
    ) -> Result<String, SyncError>;

    async fn add_reaction(
        &self,
        name: &str,
        channel_id: &str,
        message_id: &str,
    ) -> Result<bool, SyncError>;

    async fn remove_reaction(
        &self,
        name: &str,
        channel_id: &str,
        message_id: &str,
    ) -> Result<bool, SyncError>;
}

pub use client::HttpMessageSource;
