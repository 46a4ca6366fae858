//! Named cache partitions
//!
//! A [`CacheStorage`] holds any number of named partitions; each open
//! partition is a [`CacheStore`] mapping absolute request URLs to stored
//! responses. The cache manager works with exactly three partitions:
//!
//! | Partition | Name | Contents |
//! |-----------|------|----------|
//! | staging | `<app>-temp-cache` | App shell fetched during install |
//! | content | `<app>-app-cache` | Everything served offline |
//! | manifest | `<app>-app-manifest` | The manifest of the last activation |
//!
//! Each one is wrapped in its own handle type so the reconciliation routine
//! cannot mix them up.

mod disk;
mod memory;

pub use disk::{DiskStorage, DiskStore};
pub use memory::{MemoryStorage, MemoryStore};

use crate::error::{ShellkeepError, ShellkeepResult};
use crate::manifest::ResourceManifest;
use crate::net::CachedResponse;
use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

/// Entry key of the stored manifest inside the manifest partition
pub const MANIFEST_ENTRY_KEY: &str = "manifest";

/// Default application prefix for partition names
pub const DEFAULT_APP_NAME: &str = "flutter";

/// A single named partition
///
/// Operations on one key are atomic; concurrent writers to the same key
/// resolve as last-write-wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Partition name this handle was opened with
    fn name(&self) -> &str;

    /// Every stored key
    async fn keys(&self) -> ShellkeepResult<Vec<String>>;

    /// Stored response for a key
    async fn get(&self, key: &str) -> ShellkeepResult<Option<CachedResponse>>;

    /// Store a response, replacing any previous one
    async fn put(&self, key: &str, response: &CachedResponse) -> ShellkeepResult<()>;

    /// Remove a key, returning whether it existed
    async fn delete(&self, key: &str) -> ShellkeepResult<bool>;

    /// Store several responses
    async fn put_all(&self, entries: &[(String, CachedResponse)]) -> ShellkeepResult<()> {
        for (key, response) in entries {
            self.put(key, response).await?;
        }
        Ok(())
    }
}

/// A set of named partitions
#[async_trait]
pub trait CacheStorage: Send + Sync {
    type Store: CacheStore + 'static;

    /// Open a partition, creating it if missing
    async fn open(&self, name: &str) -> ShellkeepResult<Self::Store>;

    /// Delete a partition and everything in it, returning whether it existed.
    ///
    /// Writes through handles opened earlier never recreate the partition;
    /// `has` stays false until the next `open`.
    async fn delete(&self, name: &str) -> ShellkeepResult<bool>;

    /// Whether a partition exists
    async fn has(&self, name: &str) -> ShellkeepResult<bool>;
}

/// Names of the three partitions used by one app
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionNames {
    pub staging: String,
    pub content: String,
    pub manifest: String,
}

impl PartitionNames {
    /// Derive partition names from an app prefix
    pub fn for_app(app: &str) -> Self {
        Self {
            staging: format!("{}-temp-cache", app),
            content: format!("{}-app-cache", app),
            manifest: format!("{}-app-manifest", app),
        }
    }

    /// All names, staging first
    pub fn all(&self) -> [&str; 3] {
        [&self.staging, &self.content, &self.manifest]
    }
}

impl Default for PartitionNames {
    fn default() -> Self {
        Self::for_app(DEFAULT_APP_NAME)
    }
}

/// Partition written during install and drained during activation
pub struct StagingPartition<S>(S);

impl<S: CacheStore> StagingPartition<S> {
    pub fn new(store: S) -> Self {
        Self(store)
    }

    /// Stage a complete set of fetched responses
    pub async fn stage(&self, entries: &[(String, CachedResponse)]) -> ShellkeepResult<()> {
        self.0.put_all(entries).await
    }

    /// Every staged entry
    pub async fn entries(&self) -> ShellkeepResult<Vec<(String, CachedResponse)>> {
        let mut entries = Vec::new();
        for key in self.0.keys().await? {
            if let Some(response) = self.0.get(&key).await? {
                entries.push((key, response));
            }
        }
        Ok(entries)
    }

    pub fn store(&self) -> &S {
        &self.0
    }
}

/// The partition requests are served from
pub struct ContentPartition<S>(S);

impl<S: CacheStore> ContentPartition<S> {
    pub fn new(store: S) -> Self {
        Self(store)
    }

    pub async fn keys(&self) -> ShellkeepResult<Vec<String>> {
        self.0.keys().await
    }

    pub async fn get(&self, url: &str) -> ShellkeepResult<Option<CachedResponse>> {
        self.0.get(url).await
    }

    pub async fn put(&self, url: &str, response: &CachedResponse) -> ShellkeepResult<()> {
        self.0.put(url, response).await
    }

    pub async fn put_all(&self, entries: &[(String, CachedResponse)]) -> ShellkeepResult<()> {
        self.0.put_all(entries).await
    }

    pub async fn delete(&self, url: &str) -> ShellkeepResult<bool> {
        self.0.delete(url).await
    }

    pub fn store(&self) -> &S {
        &self.0
    }
}

/// The partition holding the manifest of the last successful activation
pub struct ManifestPartition<S>(S);

impl<S: CacheStore> ManifestPartition<S> {
    pub fn new(store: S) -> Self {
        Self(store)
    }

    /// Read the stored manifest, `None` on a first install
    pub async fn load(&self) -> ShellkeepResult<Option<ResourceManifest>> {
        let Some(entry) = self.0.get(MANIFEST_ENTRY_KEY).await? else {
            return Ok(None);
        };

        ResourceManifest::from_json(&entry.body)
            .map(Some)
            .map_err(|e| ShellkeepError::store(self.0.name(), format!("stored manifest unreadable: {}", e)))
    }

    /// Replace the stored manifest
    pub async fn save(&self, manifest: &ResourceManifest) -> ShellkeepResult<()> {
        let response = CachedResponse {
            status: 200,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: manifest.to_json()?.into_bytes(),
        };
        self.0.put(MANIFEST_ENTRY_KEY, &response).await
    }

    pub fn store(&self) -> &S {
        &self.0
    }
}

/// The three partitions, opened together
pub struct Partitions<S> {
    pub content: ContentPartition<S>,
    pub staging: StagingPartition<S>,
    pub manifest: ManifestPartition<S>,
}

impl<S: CacheStore + 'static> Partitions<S> {
    /// Open (creating if needed) all partitions of an app
    pub async fn open<St>(storage: &St, names: &PartitionNames) -> ShellkeepResult<Self>
    where
        St: CacheStorage<Store = S> + ?Sized,
    {
        Ok(Self {
            content: ContentPartition::new(storage.open(&names.content).await?),
            staging: StagingPartition::new(storage.open(&names.staging).await?),
            manifest: ManifestPartition::new(storage.open(&names.manifest).await?),
        })
    }
}

/// Delete every partition of an app.
///
/// All deletions are attempted; the first error is returned afterwards.
/// Returns how many partitions existed.
pub async fn delete_partitions<St>(storage: &St, names: &PartitionNames) -> ShellkeepResult<usize>
where
    St: CacheStorage + ?Sized,
{
    let mut deleted = 0;
    let mut first_error = None;

    for name in names.all() {
        match storage.delete(name).await {
            Ok(true) => deleted += 1,
            Ok(false) => {}
            Err(e) => {
                warn!("Failed to delete partition {}: {}", name, e);
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(deleted),
    }
}
