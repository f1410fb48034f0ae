//! Typed access to the persisted library collections.
//!
//! Four collections live in the document store: `sources`, `groups`,
//! `channels`, `favorites`. All operations follow the store's
//! whole-collection contract: read the full list, mutate in memory, write
//! the full list back. Writes pass the revision they read, so a concurrent
//! writer shows up as a conflict and the mutation is retried on a fresh
//! snapshot instead of silently clobbering it.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use crate::errors::AppResult;
use crate::store::{DocumentStore, JsonFileStore, MemoryStore, StoreError};

pub mod channels;
pub mod favorites;
pub mod groups;
pub mod migrate;
pub mod sources;

pub use migrate::MigrationReport;

pub const SOURCES: &str = "sources";
pub const GROUPS: &str = "groups";
pub const CHANNELS: &str = "channels";
pub const FAVORITES: &str = "favorites";

/// How many times a read-modify-write cycle is retried when the store
/// reports a revision conflict.
const WRITE_RETRIES: usize = 3;

#[derive(Clone)]
pub struct Library {
    store: Arc<dyn DocumentStore>,
}

impl Library {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Open (or create) a JSON-file backed library.
    pub fn open<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        Ok(Self::new(Arc::new(JsonFileStore::open(path)?)))
    }

    /// Volatile library for tests and scratch use.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Read a collection as a typed list. A missing collection is an empty
    /// list at revision 0.
    pub(crate) fn read_list<T: DeserializeOwned>(&self, key: &str) -> AppResult<(u64, Vec<T>)> {
        match self.store.get(key)? {
            Some(snapshot) => {
                let records = serde_json::from_value(snapshot.value)
                    .map_err(StoreError::Serialization)?;
                Ok((snapshot.revision, records))
            }
            None => Ok((0, Vec::new())),
        }
    }

    pub(crate) fn write_list<T: Serialize>(
        &self,
        key: &str,
        expected: u64,
        records: &[T],
    ) -> AppResult<()> {
        let value = serde_json::to_value(records).map_err(StoreError::Serialization)?;
        self.store.put(key, value, Some(expected))?;
        Ok(())
    }

    /// Read-modify-write one collection, retrying on revision conflicts.
    /// The closure may run more than once and must not assume its previous
    /// attempts happened.
    pub(crate) fn update_list<T, R, F>(&self, key: &str, mut mutate: F) -> AppResult<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(&mut Vec<T>) -> R,
    {
        let mut attempts = 0;
        loop {
            let (revision, mut records) = self.read_list::<T>(key)?;
            let result = mutate(&mut records);
            match self.write_list(key, revision, &records) {
                Ok(()) => return Ok(result),
                Err(crate::errors::AppError::Store(StoreError::Conflict { .. }))
                    if attempts < WRITE_RETRIES =>
                {
                    attempts += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_collection_reads_as_empty() {
        let library = Library::in_memory();
        let (revision, records) = library.read_list::<String>(CHANNELS).unwrap();
        assert_eq!(revision, 0);
        assert!(records.is_empty());
    }

    #[test]
    fn update_list_persists_mutation() {
        let library = Library::in_memory();
        let pushed = library
            .update_list::<String, _, _>(GROUPS, |records| {
                records.push("News".to_string());
                records.len()
            })
            .unwrap();
        assert_eq!(pushed, 1);

        let (revision, records) = library.read_list::<String>(GROUPS).unwrap();
        assert_eq!(revision, 1);
        assert_eq!(records, vec!["News".to_string()]);
    }
}
