//! Read-status reconciliation.
//!
//! The in-memory map reflects read actions taken during the session about to
//! be overwritten by a refresh; a stale persisted write must never silently
//! un-read a message the user just read, so the in-memory side wins on
//! conflict.

use std::collections::HashMap;

use tracing::debug;

use crate::storage::ReadStatusStore;

/// Merge the persisted read map with the current in-memory one. For ids
/// present on both sides, `current` wins; otherwise whichever side has the
/// entry wins.
#[must_use]
pub fn merge(
    persisted: &HashMap<String, bool>,
    current: &HashMap<String, bool>,
) -> HashMap<String, bool> {
    let mut merged = persisted.clone();
    merged.extend(current.iter().map(|(id, read)| (id.clone(), *read)));
    merged
}

/// Absent ids are unread.
#[must_use]
pub fn lookup(map: &HashMap<String, bool>, id: &str) -> bool {
    map.get(id).copied().unwrap_or(false)
}

/// Write the ledger back to persistence, swallowing failures. The in-memory
/// state stays authoritative for the session either way.
pub async fn persist_best_effort<P: ReadStatusStore + ?Sized>(
    store: &P,
    map: &HashMap<String, bool>,
) {
    if let Err(e) = store.save(map).await {
        debug!("Ignoring read-status persistence failure: {}", e);
    }
}

#[cfg(test)]
mod ledger_tests {
    use super::*;

    fn map(entries: &[(&str, bool)]) -> HashMap<String, bool> {
        entries
            .iter()
            .map(|(id, read)| ((*id).to_string(), *read))
            .collect()
    }

    #[test]
    fn test_current_wins_over_persisted() {
        // Persisted says m1 was read; the session just un-read it.
        let persisted = map(&[("m1", true)]);
        let current = map(&[("m1", false), ("m2", true)]);

        let merged = merge(&persisted, &current);

        assert_eq!(merged, map(&[("m1", false), ("m2", true)]));
    }

    #[test]
    fn test_disjoint_sides_both_survive() {
        let persisted = map(&[("m1", true)]);
        let current = map(&[("m2", false)]);

        let merged = merge(&persisted, &current);

        assert_eq!(merged.len(), 2);
        assert!(lookup(&merged, "m1"));
        assert!(!lookup(&merged, "m2"));
    }

    #[test]
    fn test_lookup_defaults_to_unread() {
        let merged = merge(&HashMap::new(), &HashMap::new());
        assert!(!lookup(&merged, "never-seen"));
    }

    #[test]
    fn test_persisted_ids_outlive_messages() {
        // Entries for ids no longer stored anywhere are carried, not errors.
        let persisted = map(&[("gone-from-store", true)]);
        let merged = merge(&persisted, &HashMap::new());
        assert!(lookup(&merged, "gone-from-store"));
    }
}
