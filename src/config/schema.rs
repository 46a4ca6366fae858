//! Configuration schema for shellkeep
//!
//! Configuration is stored at `~/.config/shellkeep/config.toml`, with
//! per-project overrides in `.shellkeep.toml`.

use crate::store::DEFAULT_APP_NAME;
use crate::worker::DEFAULT_CONCURRENCY;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// The deployed app being mirrored
    pub app: AppConfig,

    /// Cache storage settings
    pub cache: CacheConfig,

    /// Network settings
    pub network: NetworkConfig,

    /// Worker lifecycle settings
    pub worker: WorkerConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Append lifecycle events to the journal
    pub journal: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            journal: true,
        }
    }
}

/// App settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Prefix of the cache partition names
    pub name: String,

    /// Origin the app is served from, e.g. `https://app.example.com`
    pub origin: Option<String>,

    /// Resource manifest: JSON file or generated worker script
    pub manifest: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_APP_NAME.to_string(),
            origin: None,
            manifest: None,
        }
    }
}

/// Cache storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache root (default: `~/.cache/shellkeep`)
    pub dir: Option<PathBuf>,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// User agent sent with every request
    pub user_agent: String,

    /// Concurrent requests for bulk downloads
    pub concurrency: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("shellkeep/{}", env!("CARGO_PKG_VERSION")),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Worker lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Activate right after install instead of waiting
    pub skip_waiting_on_install: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            skip_waiting_on_install: true,
        }
    }
}
