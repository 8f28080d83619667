//! Coordinates full, incremental, and paginated sync across channels.
//!
//! Per-channel fetches fan out concurrently and each is wrapped in a timeout;
//! a failure or hang in one channel never blocks the others (bulkhead
//! isolation). Results are applied to the shared [`FeedState`] one at a time
//! through its mutex. Each operation class is guarded by a real async lock
//! acquired with `try_lock`: a guarded call that finds its class already
//! running is a silent no-op.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::catalog::ChannelCatalog;
use super::enrich::AuthorResolver;
use super::ledger;
use super::notify::{self, Notifier};
use super::reactions::ReactionLocks;
use super::state::FeedState;
use super::threads;
use crate::core::models::{Channel, Message, MessagePage};
use crate::errors::SyncError;
use crate::remote::MessageSource;
use crate::storage::ReadStatusStore;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Cap on each per-channel fetch. A timed-out channel is treated as an
    /// ordinary per-channel failure.
    pub fetch_timeout: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

pub struct SyncOrchestrator<S, P, N> {
    source: Arc<S>,
    read_store: Arc<P>,
    notifier: Arc<N>,
    options: SyncOptions,
    state: Arc<Mutex<FeedState>>,
    resolver: Arc<AuthorResolver<S>>,
    full_guard: Mutex<()>,
    incremental_guard: Mutex<()>,
    more_guard: Mutex<()>,
    reaction_locks: ReactionLocks,
    is_loading: AtomicBool,
    is_loading_more: AtomicBool,
}

impl<S, P, N> SyncOrchestrator<S, P, N>
where
    S: MessageSource + 'static,
    P: ReadStatusStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(source: S, read_store: P, notifier: N, options: SyncOptions) -> Self {
        let source = Arc::new(source);
        Self {
            resolver: Arc::new(AuthorResolver::new(Arc::clone(&source))),
            source,
            read_store: Arc::new(read_store),
            notifier: Arc::new(notifier),
            options,
            state: Arc::new(Mutex::new(FeedState::default())),
            full_guard: Mutex::new(()),
            incremental_guard: Mutex::new(()),
            more_guard: Mutex::new(()),
            reaction_locks: ReactionLocks::default(),
            is_loading: AtomicBool::new(false),
            is_loading_more: AtomicBool::new(false),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Sync operations
    // ─────────────────────────────────────────────────────────────────────

    /// Replace the feed with fresh page-1 history from every member channel.
    ///
    /// The one fatal failure is the channel listing itself: it sets the error,
    /// clears connectivity, and leaves the previous feed untouched.
    ///
    /// # Errors
    ///
    /// Returns an error only for that infrastructure-level failure;
    /// per-channel fetch errors are logged and skipped.
    pub async fn full_refresh(&self) -> Result<(), SyncError> {
        let Ok(_guard) = self.full_guard.try_lock() else {
            debug!("Full refresh already running; skipping");
            return Ok(());
        };

        self.is_loading.store(true, Ordering::SeqCst);
        let result = self.run_full_refresh().await;
        self.is_loading.store(false, Ordering::SeqCst);

        if let Err(e) = &result {
            warn!("Full refresh failed: {}", e);
            let mut state = self.state.lock().await;
            state.last_error = Some(e.to_string());
            state.connected = false;
        }
        result
    }

    async fn run_full_refresh(&self) -> Result<(), SyncError> {
        let (current_reads, old_ids) = {
            let mut state = self.state.lock().await;
            state.cursors.clear();
            (state.read_map.clone(), state.store.ids())
        };

        let persisted = match self.read_store.load().await {
            Ok(map) => map,
            Err(e) => {
                debug!("Ignoring read-status load failure: {}", e);
                HashMap::new()
            }
        };
        let merged = ledger::merge(&persisted, &current_reads);

        let mut catalog = ChannelCatalog::default();
        catalog.replace(self.source.get_channels().await?);

        let members = catalog.members();
        let mut results = self.fan_out_page_one(&members, true).await;

        if members.is_empty() && results.iter().all(|(_, page)| page.messages.is_empty()) {
            let non_members = catalog.non_members();
            info!(
                "Not a member of any channel; attempting to join {} channel(s)",
                non_members.len()
            );
            results = self.fan_out_join_and_fetch(&non_members).await;
        }

        let mut fetched: Vec<Message> = Vec::new();
        let mut pages: Vec<(String, Option<String>, bool)> = Vec::new();
        for (channel_id, page) in results {
            pages.push((channel_id, page.next_cursor, page.has_more));
            fetched.extend(page.messages.into_iter().map(|m| {
                let read = ledger::lookup(&merged, &m.id);
                m.with_read(read)
            }));
        }

        let (fresh, unresolved, cached_user) = {
            let mut state = self.state.lock().await;
            state.catalog = catalog;
            state.store.replace_all(fetched);
            for (channel_id, token, has_more) in pages {
                state.cursors.record(&channel_id, token, has_more);
            }
            state.has_more = state.cursors.any_more();
            // Connectivity holds even for an empty feed; only infrastructure
            // failures clear it.
            state.connected = true;
            state.last_error = None;
            state.read_map = merged.clone();

            let fresh: Vec<Message> = notify::diff_new(&old_ids, state.store.messages())
                .into_iter()
                .cloned()
                .collect();
            (
                fresh,
                state.store.unresolved_authors(),
                state.current_user_id.clone(),
            )
        };

        info!(
            "Full refresh complete: {} new message(s), {} unresolved author(s)",
            fresh.len(),
            unresolved.len()
        );

        let me = match cached_user {
            Some(id) => Some(id),
            None => self.resolve_current_user().await,
        };
        notify::forward_new(self.notifier.as_ref(), &fresh, me.as_deref()).await;

        ledger::persist_best_effort(self.read_store.as_ref(), &merged).await;
        self.resolver.spawn(Arc::clone(&self.state), unresolved);
        Ok(())
    }

    /// Fetch only messages newer than what is already stored, per member
    /// channel, leaving pagination cursors untouched.
    ///
    /// # Errors
    ///
    /// Currently infallible in practice; per-channel failures are logged and
    /// skipped.
    pub async fn incremental_refresh(&self) -> Result<(), SyncError> {
        if self.is_loading.load(Ordering::SeqCst) || self.is_loading_more.load(Ordering::SeqCst) {
            debug!("A load is already in progress; skipping incremental refresh");
            return Ok(());
        }
        let Ok(_guard) = self.incremental_guard.try_lock() else {
            return Ok(());
        };

        self.is_loading.store(true, Ordering::SeqCst);
        let result = self.run_incremental().await;
        self.is_loading.store(false, Ordering::SeqCst);
        result
    }

    async fn run_incremental(&self) -> Result<(), SyncError> {
        let (members, newest): (Vec<Channel>, HashMap<String, DateTime<Utc>>) = {
            let state = self.state.lock().await;
            let members = state.catalog.members();
            let newest = members
                .iter()
                .filter_map(|c| {
                    state
                        .store
                        .newest_timestamp_for(&c.id)
                        .map(|t| (c.id.clone(), t))
                })
                .collect();
            (members, newest)
        };

        let results = self.fan_out_page_one(&members, false).await;

        // Keep only messages strictly newer than each channel's newest stored
        // timestamp. New messages default to unread; no ledger lookup.
        let mut fetched: Vec<Message> = Vec::new();
        for (channel_id, page) in results {
            let cutoff = newest.get(&channel_id).copied();
            fetched.extend(
                page.messages
                    .into_iter()
                    .filter(|m| cutoff.is_none_or(|t| m.timestamp > t)),
            );
        }

        let (fresh, unresolved, cached_user) = {
            let mut state = self.state.lock().await;
            let inserted: HashSet<String> = state.store.merge_new(fetched).into_iter().collect();
            let fresh: Vec<Message> = state
                .store
                .messages()
                .iter()
                .filter(|m| inserted.contains(&m.id))
                .cloned()
                .collect();
            (
                fresh,
                state.store.unresolved_authors(),
                state.current_user_id.clone(),
            )
        };

        if !fresh.is_empty() {
            info!("Incremental refresh added {} message(s)", fresh.len());
        }

        let me = match cached_user {
            Some(id) => Some(id),
            None => self.resolve_current_user().await,
        };
        notify::forward_new(self.notifier.as_ref(), &fresh, me.as_deref()).await;

        self.resolver.spawn(Arc::clone(&self.state), unresolved);
        Ok(())
    }

    /// Page every channel that still holds a cursor one step further back.
    ///
    /// # Errors
    ///
    /// Per-channel failures are logged and skipped; other channels still
    /// contribute.
    pub async fn load_more(&self) -> Result<(), SyncError> {
        let Ok(_guard) = self.more_guard.try_lock() else {
            debug!("Load-more already running; skipping");
            return Ok(());
        };
        if !self.state.lock().await.has_more {
            debug!("No further history; skipping load-more");
            return Ok(());
        }

        self.is_loading_more.store(true, Ordering::SeqCst);
        let result = self.run_load_more().await;
        self.is_loading_more.store(false, Ordering::SeqCst);
        result
    }

    async fn run_load_more(&self) -> Result<(), SyncError> {
        // Ledger snapshot taken at the start of this call; read actions that
        // land mid-flight are reconciled by the next refresh.
        let current_reads = self.state.lock().await.read_map.clone();
        let persisted = match self.read_store.load().await {
            Ok(map) => map,
            Err(e) => {
                debug!("Ignoring read-status load failure: {}", e);
                HashMap::new()
            }
        };
        let snapshot = ledger::merge(&persisted, &current_reads);

        let holding = self.state.lock().await.cursors.holding();

        let fetches = holding.into_iter().map(|(channel_id, token)| {
            let source = Arc::clone(&self.source);
            let fetch_timeout = self.options.fetch_timeout;
            async move {
                match timeout(
                    fetch_timeout,
                    source.get_messages(&channel_id, token.as_deref()),
                )
                .await
                {
                    Ok(Ok(page)) => Some((channel_id, page)),
                    Ok(Err(e)) => {
                        warn!("Load-more fetch for channel {} failed: {}", channel_id, e);
                        None
                    }
                    Err(_) => {
                        warn!("Load-more fetch for channel {} timed out", channel_id);
                        None
                    }
                }
            }
        });
        let results: Vec<(String, MessagePage)> =
            join_all(fetches).await.into_iter().flatten().collect();

        let unresolved = {
            let mut state = self.state.lock().await;
            for (channel_id, page) in results {
                state
                    .cursors
                    .record(&channel_id, page.next_cursor.clone(), page.has_more);
                let older: Vec<Message> = page
                    .messages
                    .into_iter()
                    .map(|m| {
                        let read = ledger::lookup(&snapshot, &m.id);
                        m.with_read(read)
                    })
                    .collect();
                state.store.merge_new(older);
            }
            state.has_more = state.cursors.any_more();
            state.store.unresolved_authors()
        };

        self.resolver.spawn(Arc::clone(&self.state), unresolved);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutations through the remote interface
    // ─────────────────────────────────────────────────────────────────────

    /// Toggle the current user's reaction on a message, then resync.
    ///
    /// The remote mutation is followed by a full resync rather than a local
    /// patch, so counts and reactor ids always reflect the canonical remote
    /// state (consistency over responsiveness). Toggles on the same message
    /// id are serialized.
    ///
    /// # Errors
    ///
    /// Returns an error if the message is unknown, the current user cannot be
    /// resolved, or the remote call fails. On failure no local state changes.
    pub async fn toggle_reaction(&self, emoji: &str, message_id: &str) -> Result<(), SyncError> {
        let _guard = self.reaction_locks.acquire(message_id).await;

        // Release the state lock before resolving: resolve_current_user locks
        // state again, and tokio mutexes are not reentrant.
        let cached_user = self.state.lock().await.current_user_id.clone();
        let me = match cached_user {
            Some(id) => id,
            None => self.resolve_current_user().await.ok_or_else(|| {
                SyncError::GeneralError("Current user id unavailable".to_string())
            })?,
        };

        let (channel_id, already_reacted) = {
            let state = self.state.lock().await;
            let message = state
                .store
                .get(message_id)
                .ok_or_else(|| SyncError::GeneralError(format!("Unknown message {message_id}")))?;
            (
                message.channel_id.clone(),
                message.has_reaction_from(emoji, &me),
            )
        };

        if already_reacted {
            self.source
                .remove_reaction(emoji, &channel_id, message_id)
                .await?;
        } else {
            self.source
                .add_reaction(emoji, &channel_id, message_id)
                .await?;
        }

        self.full_refresh().await
    }

    /// Post a message and resync. Returns the remote id of the new message.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote send fails; no local state changes.
    pub async fn send_message(
        &self,
        text: &str,
        channel_id: &str,
        thread_parent_id: Option<&str>,
    ) -> Result<String, SyncError> {
        let id = self
            .source
            .send_message(text, channel_id, thread_parent_id)
            .await?;
        self.full_refresh().await?;
        Ok(id)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Local read-state mutations
    // ─────────────────────────────────────────────────────────────────────

    /// Mark one message read. Returns whether the id was present. The durable
    /// write is best-effort and never gates the in-memory update.
    pub async fn mark_read(&self, message_id: &str) -> bool {
        let map = {
            let mut state = self.state.lock().await;
            if !state.store.update(message_id, |m| m.with_read(true)) {
                return false;
            }
            state.read_map.insert(message_id.to_string(), true);
            state.read_map.clone()
        };
        ledger::persist_best_effort(self.read_store.as_ref(), &map).await;
        true
    }

    pub async fn mark_all_read(&self) {
        let map = {
            let mut state = self.state.lock().await;
            let unread: Vec<String> = state
                .store
                .messages()
                .iter()
                .filter(|m| !m.is_read)
                .map(|m| m.id.clone())
                .collect();
            for id in &unread {
                state.store.update(id, |m| m.with_read(true));
                state.read_map.insert(id.clone(), true);
            }
            state.read_map.clone()
        };
        ledger::persist_best_effort(self.read_store.as_ref(), &map).await;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Exposed surface
    // ─────────────────────────────────────────────────────────────────────

    /// The merged feed, newest first.
    pub async fn messages(&self) -> Vec<Message> {
        self.state.lock().await.store.messages().to_vec()
    }

    /// The thread rooted at `parent_id`, oldest first.
    pub async fn get_thread_messages(&self, parent_id: &str) -> Vec<Message> {
        let state = self.state.lock().await;
        threads::thread_messages(state.store.messages(), parent_id)
    }

    pub async fn unread_count(&self) -> usize {
        self.state.lock().await.store.unread_count()
    }

    pub async fn has_more_messages(&self) -> bool {
        self.state.lock().await.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading.load(Ordering::SeqCst)
    }

    pub fn is_loading_more(&self) -> bool {
        self.is_loading_more.load(Ordering::SeqCst)
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.lock().await.last_error.clone()
    }

    pub async fn connected(&self) -> bool {
        self.state.lock().await.connected
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    /// Concurrent page-1 fetch for each channel. Timeouts and errors drop
    /// just that channel's contribution.
    async fn fan_out_page_one(
        &self,
        channels: &[Channel],
        join_on_empty: bool,
    ) -> Vec<(String, MessagePage)> {
        let fetches = channels.iter().map(|channel| {
            let source = Arc::clone(&self.source);
            let channel_id = channel.id.clone();
            let fetch_timeout = self.options.fetch_timeout;
            async move {
                match timeout(
                    fetch_timeout,
                    fetch_first_page(source.as_ref(), &channel_id, join_on_empty),
                )
                .await
                {
                    Ok(Ok(page)) => Some((channel_id, page)),
                    Ok(Err(e)) => {
                        warn!("Fetch for channel {} failed: {}", channel_id, e);
                        None
                    }
                    Err(_) => {
                        warn!("Fetch for channel {} timed out", channel_id);
                        None
                    }
                }
            }
        });
        join_all(fetches).await.into_iter().flatten().collect()
    }

    /// Fallback path when the user is a member of nothing: join each channel
    /// and fetch once.
    async fn fan_out_join_and_fetch(&self, channels: &[Channel]) -> Vec<(String, MessagePage)> {
        let fetches = channels.iter().map(|channel| {
            let source = Arc::clone(&self.source);
            let channel_id = channel.id.clone();
            let fetch_timeout = self.options.fetch_timeout;
            async move {
                // The timeout covers the join as well, so a stuck join cannot
                // stall the whole fan-out.
                let join_and_fetch = async {
                    let joined = match source.join_channel(&channel_id).await {
                        Ok(joined) => joined,
                        Err(e) => {
                            warn!("Join for channel {} failed: {}", channel_id, e);
                            false
                        }
                    };
                    if !joined {
                        return None;
                    }
                    Some(source.get_messages(&channel_id, None).await)
                };
                match timeout(fetch_timeout, join_and_fetch).await {
                    Ok(Some(Ok(page))) => Some((channel_id, page)),
                    Ok(Some(Err(e))) => {
                        warn!("Fetch for channel {} failed: {}", channel_id, e);
                        None
                    }
                    Ok(None) => None,
                    Err(_) => {
                        warn!("Join or fetch for channel {} timed out", channel_id);
                        None
                    }
                }
            }
        });
        join_all(fetches).await.into_iter().flatten().collect()
    }

    async fn resolve_current_user(&self) -> Option<String> {
        match self.source.current_user_id().await {
            Ok(id) => {
                self.state.lock().await.current_user_id = Some(id.clone());
                Some(id)
            }
            Err(e) => {
                warn!("Could not resolve current user id: {}", e);
                None
            }
        }
    }
}

/// Page-1 fetch with the empty-channel recovery: an empty first page gets one
/// join attempt and one refetch before the channel gives up for this cycle.
async fn fetch_first_page<S: MessageSource + ?Sized>(
    source: &S,
    channel_id: &str,
    join_on_empty: bool,
) -> Result<MessagePage, SyncError> {
    let page = source.get_messages(channel_id, None).await?;

    if page.messages.is_empty() && join_on_empty && source.join_channel(channel_id).await? {
        return source.get_messages(channel_id, None).await;
    }

    Ok(page)
}
