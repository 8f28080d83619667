//! The synchronization engine: channel catalog, pagination cursors,
//! read-status ledger, deduplicated message store, and the orchestrator
//! tying them together over the injected remote interfaces.

pub mod catalog;
pub mod cursor;
pub mod enrich;
pub mod ledger;
pub mod notify;
pub mod orchestrator;
pub mod reactions;
pub mod state;
pub mod store;
pub mod threads;

pub use notify::{LogNotifier, Notifier};
pub use orchestrator::{SyncOptions, SyncOrchestrator};
pub use store::MessageStore;
