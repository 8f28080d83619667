//! feedsync — multi-channel message feed synchronization.
//!
//! Ingests paginated history from every channel of a remote messaging source,
//! reconciles it against locally-persisted read/unread annotations,
//! deduplicates across refresh cycles, and exposes one timestamp-descending,
//! locally-augmented feed.
//!
//! # Architecture
//!
//! The engine is built from small leaves ([`sync::catalog`], [`sync::cursor`],
//! [`sync::ledger`], [`sync::store`]) coordinated by
//! [`sync::orchestrator::SyncOrchestrator`]. The remote source, read-status
//! persistence, and notification delivery are injected as traits
//! ([`remote::MessageSource`], [`storage::ReadStatusStore`],
//! [`sync::Notifier`]), so the engine runs against an in-memory substitute in
//! tests and against [`remote::HttpMessageSource`] in production.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use feedsync::remote::HttpMessageSource;
//! use feedsync::storage::FileReadStatusStore;
//! use feedsync::sync::{LogNotifier, SyncOptions, SyncOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     feedsync::setup_logging();
//!
//!     let source = HttpMessageSource::new(
//!         "token".to_string(),
//!         "https://slack.com/api".to_string(),
//!         50,
//!     );
//!     let feed = SyncOrchestrator::new(
//!         source,
//!         FileReadStatusStore::new("read_status.json"),
//!         LogNotifier,
//!         SyncOptions {
//!             fetch_timeout: Duration::from_secs(10),
//!         },
//!     );
//!
//!     feed.full_refresh().await?;
//!     println!("{} unread", feed.unread_count().await);
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod errors;
pub mod remote;
pub mod storage;
pub mod sync;

pub use crate::sync::{SyncOptions, SyncOrchestrator};

/// Configure structured logging via `RUST_LOG`, defaulting to `info`.
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
