use std::collections::HashMap;

use super::catalog::ChannelCatalog;
use super::cursor::PaginationCursors;
use super::store::MessageStore;

/// All shared feed state, guarded by one `tokio::sync::Mutex` in the
/// orchestrator. Concurrent per-channel fetch results are produced in
/// parallel but applied here one at a time.
#[derive(Debug, Default)]
pub struct FeedState {
    pub store: MessageStore,
    pub cursors: PaginationCursors,
    pub catalog: ChannelCatalog,
    /// In-memory read/unread ledger, the authoritative copy for the session.
    pub read_map: HashMap<String, bool>,
    pub has_more: bool,
    pub connected: bool,
    pub last_error: Option<String>,
    pub current_user_id: Option<String>,
}
