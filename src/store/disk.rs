//! Directory-backed cache storage
//!
//! Layout under the cache root:
//!
//! ```text
//! <root>/<partition>/<sha256(key)>.entry
//! ```
//!
//! An entry file is one line of JSON (key, status, headers) followed by the
//! raw body. Entries are written to a temp file and renamed into place, so a
//! reader sees either the old or the new entry, never a partial one.

use super::{CacheStorage, CacheStore};
use crate::error::{ShellkeepError, ShellkeepResult};
use crate::net::CachedResponse;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing::{debug, warn};

const ENTRY_EXT: &str = "entry";

/// Metadata line at the start of every entry file
#[derive(Debug, Serialize, Deserialize)]
struct EntryHeader {
    key: String,
    status: u16,
    #[serde(default)]
    headers: Vec<(String, String)>,
}

/// Storage keeping each partition in its own directory
#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn partition_dir(&self, name: &str) -> ShellkeepResult<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(ShellkeepError::store(name, "invalid partition name"));
        }
        Ok(self.root.join(name))
    }
}

/// Handle to one on-disk partition
#[derive(Debug, Clone)]
pub struct DiskStore {
    name: String,
    dir: PathBuf,
}

impl DiskStore {
    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.{}", hex::encode(digest), ENTRY_EXT))
    }

    fn store_err(&self, action: &str, path: &Path, e: impl std::fmt::Display) -> ShellkeepError {
        ShellkeepError::store(&self.name, format!("{} {}: {}", action, path.display(), e))
    }

    /// Read only the header line of an entry file
    async fn read_header(&self, path: &Path) -> ShellkeepResult<Option<EntryHeader>> {
        let file = match fs::File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.store_err("opening", path, e)),
        };

        let mut reader = BufReader::new(file);
        let mut line = Vec::new();
        reader
            .read_until(b'\n', &mut line)
            .await
            .map_err(|e| self.store_err("reading", path, e))?;

        let header = serde_json::from_slice(&line).map_err(|e| self.store_err("parsing", path, e))?;
        Ok(Some(header))
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn keys(&self) -> ShellkeepResult<Vec<String>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.store_err("listing", &self.dir, e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| self.store_err("listing", &self.dir, e))?
        {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == ENTRY_EXT) {
                continue;
            }
            match self.read_header(&path).await {
                Ok(Some(header)) => keys.push(header.key),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable cache entry: {}", e),
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn get(&self, key: &str) -> ShellkeepResult<Option<CachedResponse>> {
        let path = self.entry_path(key);
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.store_err("opening", &path, e)),
        };

        let mut reader = BufReader::new(file);
        let mut line = Vec::new();
        reader
            .read_until(b'\n', &mut line)
            .await
            .map_err(|e| self.store_err("reading", &path, e))?;
        let header: EntryHeader =
            serde_json::from_slice(&line).map_err(|e| self.store_err("parsing", &path, e))?;

        // Hash collision or a renamed file: not our key.
        if header.key != key {
            return Ok(None);
        }

        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .await
            .map_err(|e| self.store_err("reading", &path, e))?;

        Ok(Some(CachedResponse {
            status: header.status,
            headers: header.headers,
            body,
        }))
    }

    async fn put(&self, key: &str, response: &CachedResponse) -> ShellkeepResult<()> {
        let header = EntryHeader {
            key: key.to_string(),
            status: response.status,
            headers: response.headers.clone(),
        };
        let mut content = serde_json::to_vec(&header)?;
        content.push(b'\n');
        content.extend_from_slice(&response.body);

        let path = self.entry_path(key);
        let tmp = self.dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));

        match fs::write(&tmp, &content).await {
            Ok(()) => {}
            // `open` created the directory, so it was deleted under us
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Partition {} was deleted, dropping {}", self.name, key);
                return Ok(());
            }
            Err(e) => return Err(self.store_err("writing", &tmp, e)),
        }
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(self.store_err("replacing", &path, e));
        }

        debug!("Stored {} in {} ({} bytes)", key, self.name, response.body.len());
        Ok(())
    }

    async fn delete(&self, key: &str) -> ShellkeepResult<bool> {
        let path = self.entry_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.store_err("removing", &path, e)),
        }
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    type Store = DiskStore;

    async fn open(&self, name: &str) -> ShellkeepResult<DiskStore> {
        let dir = self.partition_dir(name)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| ShellkeepError::io(format!("creating partition {}", dir.display()), e))?;

        Ok(DiskStore {
            name: name.to_string(),
            dir,
        })
    }

    async fn delete(&self, name: &str) -> ShellkeepResult<bool> {
        let dir = self.partition_dir(name)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!("Deleted partition {}", dir.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ShellkeepError::io(
                format!("deleting partition {}", dir.display()),
                e,
            )),
        }
    }

    async fn has(&self, name: &str) -> ShellkeepResult<bool> {
        Ok(self.partition_dir(name)?.is_dir())
    }
}
