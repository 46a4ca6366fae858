//! Configuration management for shellkeep

pub mod schema;

pub use schema::Config;

use crate::error::{ShellkeepError, ShellkeepResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Name of the project-local config file
pub const LOCAL_CONFIG_FILE: &str = ".shellkeep.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shellkeep")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shellkeep")
    }

    /// Get the lifecycle journal path
    pub fn journal_path() -> PathBuf {
        Self::state_dir().join("journal.log")
    }

    /// Default root of the on-disk cache partitions
    pub fn default_cache_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shellkeep")
    }

    /// Cache root from config, falling back to the default
    pub fn cache_dir(config: &Config) -> PathBuf {
        config
            .cache
            .dir
            .clone()
            .unwrap_or_else(Self::default_cache_dir)
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> ShellkeepResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> ShellkeepResult<Config> {
        let value = read_toml(path).await?;
        into_config(value, path)
    }

    /// Load the global config with a project-local file layered on top.
    ///
    /// Tables are merged key by key; a value set in the local file wins.
    /// A relative `app.manifest` in the local file is resolved against the
    /// directory containing it.
    pub async fn load_merged(&self, local: Option<&Path>) -> ShellkeepResult<Config> {
        let Some(local) = local else {
            return self.load().await;
        };

        let mut merged = if self.config_path.exists() {
            read_toml(&self.config_path).await?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let mut overlay = read_toml(local).await?;
        if let Some(base) = local.parent() {
            resolve_manifest_path(&mut overlay, base);
        }
        merge_toml(&mut merged, overlay);

        into_config(merged, local)
    }

    /// Search `start` and its ancestors for a project-local config
    pub fn find_local_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(LOCAL_CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> ShellkeepResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            ShellkeepError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> ShellkeepResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ShellkeepError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Ensure the state directory exists
    pub async fn ensure_state_dirs() -> ShellkeepResult<()> {
        let dir = Self::state_dir();
        fs::create_dir_all(&dir).await.map_err(|e| {
            ShellkeepError::io(format!("creating directory {}", dir.display()), e)
        })?;
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_toml(path: &Path) -> ShellkeepResult<toml::Value> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| ShellkeepError::io(format!("reading config from {}", path.display()), e))?;

    content
        .parse()
        .map_err(|e: toml::de::Error| ShellkeepError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn into_config(value: toml::Value, path: &Path) -> ShellkeepResult<Config> {
    value
        .try_into()
        .map_err(|e: toml::de::Error| ShellkeepError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Recursively merge `overlay` into `base`
fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn resolve_manifest_path(doc: &mut toml::Value, base: &Path) {
    let Some(manifest) = doc
        .get_mut("app")
        .and_then(|app| app.get_mut("manifest"))
    else {
        return;
    };

    if let Some(path) = manifest.as_str().map(Path::new) {
        if path.is_relative() {
            *manifest = toml::Value::String(base.join(path).to_string_lossy().into_owned());
        }
    }
}
