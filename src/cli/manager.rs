//! Cache manager wiring for CLI commands

use crate::cli::Cli;
use crate::config::{Config, ConfigManager};
use crate::error::{ShellkeepError, ShellkeepResult};
use crate::journal::Journal;
use crate::key::Origin;
use crate::manifest::AppManifest;
use crate::net::HttpFetcher;
use crate::store::DiskStorage;
use crate::worker::{CacheManager, ManagerConfig};
use std::path::PathBuf;
use tracing::debug;

/// Cache manager backed by the on-disk cache and the real origin
pub type DiskManager = CacheManager<DiskStorage, HttpFetcher>;

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub origin: Option<String>,
    pub manifest: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
}

impl Overrides {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            origin: cli.origin.clone(),
            manifest: cli.manifest.clone(),
            cache_dir: cli.cache_dir.clone(),
        }
    }

    /// Effective origin
    pub fn origin(&self, config: &Config) -> ShellkeepResult<Origin> {
        let raw = self
            .origin
            .as_deref()
            .or(config.app.origin.as_deref())
            .ok_or(ShellkeepError::OriginNotConfigured)?;
        Origin::parse(raw)
    }

    /// Effective manifest path
    pub fn manifest_path(&self, config: &Config) -> ShellkeepResult<PathBuf> {
        self.manifest
            .clone()
            .or_else(|| config.app.manifest.clone())
            .ok_or(ShellkeepError::ManifestNotConfigured)
    }

    /// Effective cache root
    pub fn cache_dir(&self, config: &Config) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| ConfigManager::cache_dir(config))
    }
}

/// Build a manager for the configured app and pick up any pending install
pub async fn build_manager(config: &Config, overrides: &Overrides) -> ShellkeepResult<DiskManager> {
    let origin = overrides.origin(config)?;
    let manifest_path = overrides.manifest_path(config)?;
    let manifest = AppManifest::from_file(&manifest_path).await?;
    debug!(
        "Loaded {} resources ({} core) from {}",
        manifest.resources.len(),
        manifest.core.len(),
        manifest_path.display()
    );

    let manager_config = ManagerConfig::new(origin, manifest)
        .with_app_name(config.app.name.clone())
        .with_concurrency(config.network.concurrency)
        .with_skip_waiting_on_install(config.worker.skip_waiting_on_install);

    let cache_dir = overrides.cache_dir(config);
    debug!("Using cache root {}", cache_dir.display());

    let mut manager = CacheManager::new(
        manager_config,
        DiskStorage::new(cache_dir),
        HttpFetcher::new(&config.network.user_agent),
    )
    .with_journal(Journal::new(config));

    manager.resume().await?;
    Ok(manager)
}
