//! Per-message serialization for reaction toggles.
//!
//! The remote add/remove pair is not idempotent, so two toggles on the same
//! message racing each other could double-add or double-remove. Toggles on
//! the same message id take this lock; toggles on different messages stay
//! concurrent.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct ReactionLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ReactionLocks {
    pub async fn acquire(&self, message_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Entries with no holder and no waiter are only referenced by the
            // map itself; sweep them so the registry cannot grow unbounded.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(
                locks
                    .entry(message_id.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn registered(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[cfg(test)]
mod lock_tests {
    use super::*;

    #[tokio::test]
    async fn test_same_id_serializes() {
        let locks = ReactionLocks::default();

        let guard = locks.acquire("m1").await;
        // A second acquire on the same id must not succeed while held.
        let contended =
            tokio::time::timeout(std::time::Duration::from_millis(20), locks.acquire("m1")).await;
        assert!(contended.is_err());

        drop(guard);
        let reacquired =
            tokio::time::timeout(std::time::Duration::from_millis(20), locks.acquire("m1")).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn test_released_entries_are_swept() {
        let locks = ReactionLocks::default();

        let held = locks.acquire("m1").await;
        drop(locks.acquire("m2").await);
        assert_eq!(locks.registered().await, 2);

        // The next acquire sweeps the released entry but keeps the held one.
        drop(locks.acquire("m3").await);
        assert_eq!(locks.registered().await, 2);

        // Once nothing is held, a single acquire empties the registry down
        // to its own entry.
        drop(held);
        drop(locks.acquire("m4").await);
        assert_eq!(locks.registered().await, 1);
    }

    #[tokio::test]
    async fn test_distinct_ids_stay_concurrent() {
        let locks = ReactionLocks::default();

        let _guard = locks.acquire("m1").await;
        let other =
            tokio::time::timeout(std::time::Duration::from_millis(20), locks.acquire("m2")).await;
        assert!(other.is_ok());
    }
}
