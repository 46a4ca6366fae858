//! In-process cache storage

use super::{CacheStorage, CacheStore};
use crate::error::ShellkeepResult;
use crate::net::CachedResponse;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

type Entries = Arc<Mutex<BTreeMap<String, CachedResponse>>>;

/// Storage that keeps every partition in memory
///
/// Clones share the same partitions. Deleting a partition detaches handles
/// that are already open: they keep working on the old contents while the
/// next `open` starts from an empty partition.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    partitions: Arc<Mutex<HashMap<String, Entries>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn partitions(&self) -> MutexGuard<'_, HashMap<String, Entries>> {
        // A poisoned lock only means another test thread panicked mid-insert;
        // the map itself is still consistent.
        self.partitions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Handle to one in-memory partition
#[derive(Debug, Clone)]
pub struct MemoryStore {
    name: String,
    entries: Entries,
}

impl MemoryStore {
    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, CachedResponse>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn keys(&self) -> ShellkeepResult<Vec<String>> {
        Ok(self.entries().keys().cloned().collect())
    }

    async fn get(&self, key: &str) -> ShellkeepResult<Option<CachedResponse>> {
        Ok(self.entries().get(key).cloned())
    }

    async fn put(&self, key: &str, response: &CachedResponse) -> ShellkeepResult<()> {
        self.entries().insert(key.to_string(), response.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> ShellkeepResult<bool> {
        Ok(self.entries().remove(key).is_some())
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    type Store = MemoryStore;

    async fn open(&self, name: &str) -> ShellkeepResult<MemoryStore> {
        let entries = self.partitions().entry(name.to_string()).or_default().clone();
        Ok(MemoryStore {
            name: name.to_string(),
            entries,
        })
    }

    async fn delete(&self, name: &str) -> ShellkeepResult<bool> {
        Ok(self.partitions().remove(name).is_some())
    }

    async fn has(&self, name: &str) -> ShellkeepResult<bool> {
        Ok(self.partitions().contains_key(name))
    }
}
