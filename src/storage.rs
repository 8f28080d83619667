//! Read-status persistence.
//!
//! The durable copy of the read/unread map trails the in-memory state:
//! callers treat every load/save as best-effort and the in-memory ledger
//! stays authoritative for the session.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::errors::SyncError;

/// Persistence collaborator for the per-message read/unread map.
#[async_trait]
pub trait ReadStatusStore: Send + Sync {
    async fn load(&self) -> Result<HashMap<String, bool>, SyncError>;

    async fn save(&self, map: &HashMap<String, bool>) -> Result<(), SyncError>;
}

/// JSON-file backed store. A missing file loads as an empty map.
pub struct FileReadStatusStore {
    path: PathBuf,
}

impl FileReadStatusStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ReadStatusStore for FileReadStatusStore {
    async fn load(&self) -> Result<HashMap<String, bool>, SyncError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };

        let map = serde_json::from_str(&contents)?;
        Ok(map)
    }

    async fn save(&self, map: &HashMap<String, bool>) -> Result<(), SyncError> {
        let contents = serde_json::to_string(map)?;
        tokio::fs::write(&self.path, contents).await?;
        Ok(())
    }
}

#[cfg(test)]
mod file_store_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileReadStatusStore::new(dir.path().join("read_status.json"));

        let map = store.load().await.unwrap();
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileReadStatusStore::new(dir.path().join("read_status.json"));

        let mut map = HashMap::new();
        map.insert("m1".to_string(), true);
        map.insert("m2".to_string(), false);

        store.save(&map).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded, map);
    }
}
