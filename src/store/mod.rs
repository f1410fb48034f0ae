//! Persistent document store backing the channel library.
//!
//! The library reads and writes whole collections (sources, groups,
//! channels, favorites) as JSON documents - there is no row-level update
//! primitive. Every key carries a monotonic revision; writes may pass the
//! revision they read to detect lost updates (compare-and-swap).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Compare-and-swap failure: somebody else wrote the key in between.
    #[error("Write conflict on '{key}': expected revision {expected}, found {actual}")]
    Conflict {
        key: String,
        expected: u64,
        actual: u64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A document together with the revision it was read at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub revision: u64,
    pub value: Value,
}

/// Keyed JSON document storage with per-key revisions.
///
/// `put` with `expected: Some(rev)` fails with [`StoreError::Conflict`]
/// unless the key is still at `rev`; `expected: None` writes
/// unconditionally. A missing key is treated as revision 0.
pub trait DocumentStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<Snapshot>>;
    fn put(&self, key: &str, value: Value, expected: Option<u64>) -> StoreResult<u64>;
    fn has(&self, key: &str) -> StoreResult<bool>;
    fn delete(&self, key: &str) -> StoreResult<()>;
}

fn check_and_bump(
    entries: &mut BTreeMap<String, Snapshot>,
    key: &str,
    value: Value,
    expected: Option<u64>,
) -> StoreResult<u64> {
    let current = entries.get(key).map(|s| s.revision).unwrap_or(0);
    if let Some(expected) = expected {
        if expected != current {
            return Err(StoreError::Conflict {
                key: key.to_string(),
                expected,
                actual: current,
            });
        }
    }
    let revision = current + 1;
    entries.insert(key.to_string(), Snapshot { revision, value });
    Ok(revision)
}

/// Volatile in-memory store, used by tests and as a scratch library.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Snapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<Snapshot>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn put(&self, key: &str, value: Value, expected: Option<u64>) -> StoreResult<u64> {
        let mut entries = self.entries.lock().unwrap();
        check_and_bump(&mut entries, key, value, expected)
    }

    fn has(&self, key: &str) -> StoreResult<bool> {
        Ok(self.entries.lock().unwrap().contains_key(key))
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Write-through store persisting all keys into a single JSON file.
///
/// The whole document set is rewritten on every mutation via a temp file
/// and rename, so a crash never leaves a half-written library on disk.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, Snapshot>>,
}

impl JsonFileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &BTreeMap<String, Snapshot>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl DocumentStore for JsonFileStore {
    fn get(&self, key: &str) -> StoreResult<Option<Snapshot>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn put(&self, key: &str, value: Value, expected: Option<u64>) -> StoreResult<u64> {
        let mut entries = self.entries.lock().unwrap();
        let revision = check_and_bump(&mut entries, key, value, expected)?;
        self.persist(&entries)?;
        Ok(revision)
    }

    fn has(&self, key: &str) -> StoreResult<bool> {
        Ok(self.entries.lock().unwrap().contains_key(key))
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock().unwrap();
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(!store.has("channels").unwrap());

        let rev = store.put("channels", json!([1, 2, 3]), None).unwrap();
        assert_eq!(rev, 1);
        let snapshot = store.get("channels").unwrap().unwrap();
        assert_eq!(snapshot.revision, 1);
        assert_eq!(snapshot.value, json!([1, 2, 3]));

        store.delete("channels").unwrap();
        assert!(store.get("channels").unwrap().is_none());
    }

    #[test]
    fn compare_and_swap_detects_conflict() {
        let store = MemoryStore::new();
        store.put("favorites", json!([]), None).unwrap();

        // Simulate a second writer sneaking in between read and write.
        store.put("favorites", json!(["other"]), Some(1)).unwrap();
        let err = store.put("favorites", json!(["stale"]), Some(1)).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { actual: 2, .. }));
    }

    #[test]
    fn cas_on_missing_key_expects_zero() {
        let store = MemoryStore::new();
        assert!(store.put("groups", json!([]), Some(1)).is_err());
        assert_eq!(store.put("groups", json!([]), Some(0)).unwrap(), 1);
    }

    #[test]
    fn json_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.json");

        {
            let store = JsonFileStore::open(&path).unwrap();
            store.put("sources", json!([{"name": "one"}]), None).unwrap();
            store.put("sources", json!([{"name": "two"}]), Some(1)).unwrap();
        }

        let store = JsonFileStore::open(&path).unwrap();
        let snapshot = store.get("sources").unwrap().unwrap();
        assert_eq!(snapshot.revision, 2);
        assert_eq!(snapshot.value, json!([{"name": "two"}]));
    }

    #[test]
    fn json_file_store_delete_removes_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.put("legacy", json!("old"), None).unwrap();
        store.delete("legacy").unwrap();
        drop(store);

        let store = JsonFileStore::open(&path).unwrap();
        assert!(!store.has("legacy").unwrap());
    }
}
