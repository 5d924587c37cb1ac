use std::collections::HashMap;
use std::fs;
use std::io;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

use crate::util::write_atomic;

/// 開啟中緩衝區快照使用的固定儲存鍵。 / Fixed storage key for the open-buffer snapshot.
pub const OPEN_BUFFERS_KEY: &str = "open_buffers";
/// 使用中緩衝區路徑的固定儲存鍵。 / Fixed storage key for the active buffer path.
pub const ACTIVE_BUFFER_KEY: &str = "active_buffer";

/// 鍵值儲存操作的錯誤。 / Errors raised by the key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage IO error: {0}")]
    Io(#[from] io::Error),
}

/// Durable key-value store consumed for session snapshots. No schema
/// versioning; values are opaque strings.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// 純記憶體鍵值儲存。 / Purely in-memory key-value store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(key);
        Ok(())
    }
}

/// 以資料夾為後盾的鍵值儲存，每個鍵一個檔案並採原子寫入。 / Directory-backed store: one file per key, atomic writes.
#[derive(Debug)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl KeyValueStore for DirStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.key_path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        write_atomic(&self.key_path(key), value.as_bytes())?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::Io(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryStore::new();
        assert!(store.get("missing").unwrap().is_none());
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn dir_store_round_trips_and_tolerates_missing_keys() {
        let tmp = tempdir().unwrap();
        let store = DirStore::new(tmp.path().join("session"));
        assert!(store.get(OPEN_BUFFERS_KEY).unwrap().is_none());
        store.set(OPEN_BUFFERS_KEY, "[]").unwrap();
        assert_eq!(store.get(OPEN_BUFFERS_KEY).unwrap().as_deref(), Some("[]"));
        store.remove(OPEN_BUFFERS_KEY).unwrap();
        store.remove(OPEN_BUFFERS_KEY).unwrap();
        assert!(store.get(OPEN_BUFFERS_KEY).unwrap().is_none());
    }
}
