//! Resource manifest handling
//!
//! The resource manifest maps every origin-relative asset path of a deployed
//! app build to a content fingerprint. The core asset list names the subset
//! that must be downloaded before the cache can serve the app shell.
//!
//! Both are fixed at build time. They are loaded either from a JSON file or
//! straight out of a generated service worker script.

mod script;

pub use script::parse_worker_script;

use crate::error::{ShellkeepError, ShellkeepResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Mapping from asset path to content fingerprint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceManifest {
    entries: BTreeMap<String, String>,
}

impl ResourceManifest {
    /// Create a manifest from `(path, fingerprint)` pairs
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Fingerprint recorded for a path
    pub fn fingerprint(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Whether the path is part of the manifest
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// All paths, in key order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// All `(path, fingerprint)` pairs, in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize as a flat JSON object
    pub fn to_json(&self) -> ShellkeepResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from a flat JSON object
    pub fn from_json(json: &[u8]) -> ShellkeepResult<Self> {
        Ok(serde_json::from_slice(json)?)
    }

    /// Compare this manifest against a previously stored one
    pub fn diff(&self, stored: &ResourceManifest) -> ManifestDiff {
        let mut diff = ManifestDiff::default();

        for (key, fingerprint) in self.iter() {
            match stored.fingerprint(key) {
                None => diff.added.push(key.to_string()),
                Some(old) if old != fingerprint => diff.changed.push(key.to_string()),
                Some(_) => diff.unchanged.push(key.to_string()),
            }
        }

        diff.removed = stored
            .keys()
            .filter(|key| !self.contains(key))
            .map(str::to_string)
            .collect();

        diff
    }
}

/// Difference between the current and a stored manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestDiff {
    pub added: Vec<String>,
    pub changed: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: Vec<String>,
}

impl ManifestDiff {
    /// Whether the two manifests are identical
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

/// Ordered list of app shell paths downloaded during install
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoreAssets(Vec<String>);

impl CoreAssets {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(paths.into_iter().map(Into::into).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Build-time constants of a deployed app version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppManifest {
    /// Every cacheable resource with its fingerprint
    pub resources: ResourceManifest,

    /// Resources that must be present before the cache is usable
    #[serde(default)]
    pub core: CoreAssets,
}

impl AppManifest {
    /// Create and validate an app manifest
    pub fn new(resources: ResourceManifest, core: CoreAssets) -> ShellkeepResult<Self> {
        let manifest = Self { resources, core };
        manifest.validate().map_err(|reason| ShellkeepError::ManifestInvalid {
            path: "<inline>".into(),
            reason,
        })?;
        Ok(manifest)
    }

    /// Load from a JSON manifest or a generated service worker script.
    ///
    /// Files ending in `.js` are treated as worker scripts, everything else
    /// as JSON of the form `{"resources": {...}, "core": [...]}`.
    pub async fn from_file(path: &Path) -> ShellkeepResult<Self> {
        if !path.exists() {
            return Err(ShellkeepError::ManifestNotFound(path.to_path_buf()));
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ShellkeepError::io(format!("reading manifest {}", path.display()), e))?;

        let invalid = |reason: String| ShellkeepError::ManifestInvalid {
            path: path.to_path_buf(),
            reason,
        };

        let manifest = if path.extension().is_some_and(|ext| ext == "js") {
            parse_worker_script(&content).map_err(invalid)?
        } else {
            serde_json::from_str::<Self>(&content).map_err(|e| invalid(e.to_string()))?
        };

        manifest.validate().map_err(invalid)?;

        debug!(
            "Loaded manifest {} ({} resources, {} core)",
            path.display(),
            manifest.resources.len(),
            manifest.core.len()
        );
        Ok(manifest)
    }

    /// Every core path must also be a resource
    fn validate(&self) -> Result<(), String> {
        let unknown: Vec<&str> = self
            .core
            .iter()
            .filter(|path| !self.resources.contains(path))
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(format!("core assets missing from resources: {}", unknown.join(", ")))
        }
    }
}
