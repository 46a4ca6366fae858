//! Offline asset cache manager
//!
//! Keeps the content partition of an app populated with a fixed, versioned
//! set of resources and serves matching requests from it.
//!
//! # Lifecycle
//!
//! | State | Entered by | Next |
//! |-------|------------|------|
//! | Parsed | construction | Installing |
//! | Installing | [`CacheManager::install`] | Installed, InstallFailed |
//! | Installed | core assets staged | Activating |
//! | InstallFailed | any core fetch failed | Installing (retry) |
//! | Activating | [`CacheManager::activate`] | Ready, Corrupted |
//! | Ready | reconciliation succeeded | - |
//! | Corrupted | reconciliation failed, all partitions deleted | Installing |
//!
//! A Corrupted manager leaves no partitions behind, so the next activation
//! behaves like a first install.

mod events;
mod message;
mod reconcile;

pub use events::{EventDispatcher, EventOutcome, ServiceWorkerHandler, WorkerEvent};
pub use message::ControlMessage;
pub use reconcile::{reconcile, ActivationOutcome, ActivationReport};

use crate::error::{ShellkeepError, ShellkeepResult};
use crate::journal::Journal;
use crate::key::{Origin, RequestKey};
use crate::manifest::{AppManifest, ManifestDiff};
use crate::net::{fetch_all, CachedResponse, FetchRequest, Fetcher, Method};
use crate::store::{
    delete_partitions, CacheStorage, CacheStore, ContentPartition, ManifestPartition,
    PartitionNames, Partitions, StagingPartition, DEFAULT_APP_NAME,
};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, error, info, warn};

/// Default number of concurrent fetches for bulk downloads
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Lifecycle state of a cache manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    InstallFailed,
    Activating,
    Ready,
    Corrupted,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::InstallFailed => "install failed",
            Self::Activating => "activating",
            Self::Ready => "ready",
            Self::Corrupted => "corrupted",
        };
        write!(f, "{}", name)
    }
}

/// Everything a cache manager needs to know about the deployed app
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Prefix of the partition names
    pub app_name: String,
    /// Origin the app is served from
    pub origin: Origin,
    /// Build-time resource manifest and core asset list
    pub manifest: AppManifest,
    /// Concurrent fetches during install and offline download
    pub concurrency: usize,
    /// Request activation as soon as install completes
    pub skip_waiting_on_install: bool,
}

impl ManagerConfig {
    pub fn new(origin: Origin, manifest: AppManifest) -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            origin,
            manifest,
            concurrency: DEFAULT_CONCURRENCY,
            skip_waiting_on_install: true,
        }
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_skip_waiting_on_install(mut self, skip: bool) -> Self {
        self.skip_waiting_on_install = skip;
        self
    }
}

/// Where a served response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Cache => write!(f, "cache"),
        }
    }
}

/// Result of intercepting a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not handled by the cache; the caller performs its default handling
    Passthrough,
    /// Answered by the cache manager
    Responded {
        key: RequestKey,
        response: CachedResponse,
        source: ResponseSource,
    },
}

/// Result of handling a control message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Waiting period will be skipped
    SkipWaiting,
    /// Keys fetched by an offline download
    Downloaded(Vec<String>),
    /// Unrecognised message
    Ignored,
}

/// Result of a successful install
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    /// Core asset keys written to staging
    pub staged: Vec<String>,
}

/// Snapshot of the on-disk cache state of one app
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub partitions: PartitionNames,
    pub origin: String,
    pub resources: usize,
    pub core: usize,
    pub content_entries: usize,
    pub staged_entries: usize,
    pub has_stored_manifest: bool,
    /// Current manifest compared to the stored one
    pub diff: Option<ManifestDiff>,
    /// Manifest keys without a content entry
    pub missing: Vec<String>,
}

/// Cache manager for one app build
pub struct CacheManager<S: CacheStorage, F: Fetcher> {
    config: ManagerConfig,
    names: PartitionNames,
    storage: S,
    fetcher: F,
    journal: Journal,
    state: WorkerState,
    skip_waiting: bool,
    clients_claimed: bool,
}

impl<S: CacheStorage, F: Fetcher> CacheManager<S, F> {
    pub fn new(config: ManagerConfig, storage: S, fetcher: F) -> Self {
        let names = PartitionNames::for_app(&config.app_name);
        Self {
            config,
            names,
            storage,
            fetcher,
            journal: Journal::disabled(),
            state: WorkerState::Parsed,
            skip_waiting: false,
            clients_claimed: false,
        }
    }

    /// Record lifecycle events to a journal
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn partition_names(&self) -> &PartitionNames {
        &self.names
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Installed but not yet activated
    pub fn is_waiting(&self) -> bool {
        self.state == WorkerState::Installed
    }

    /// Whether an installed worker should activate without waiting
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting
    }

    /// Whether the last activation took control of clients
    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed
    }

    /// Pick up an install left behind by an earlier process.
    ///
    /// A fresh manager whose staging partition already exists is waiting
    /// for activation.
    pub async fn resume(&mut self) -> ShellkeepResult<WorkerState> {
        if self.state == WorkerState::Parsed && self.storage.has(&self.names.staging).await? {
            debug!("Found staged install in {}", self.names.staging);
            self.state = WorkerState::Installed;
        }
        Ok(self.state)
    }

    /// Download the core assets into the staging partition.
    ///
    /// Any earlier staged install is discarded first. Every core path is
    /// fetched past any HTTP cache. Nothing is staged unless all of them
    /// succeed; a failure leaves the manager in `InstallFailed` and can be
    /// retried.
    pub async fn install(&mut self) -> ShellkeepResult<InstallReport> {
        self.state = WorkerState::Installing;
        info!(
            "Installing {} core assets from {}",
            self.config.manifest.core.len(),
            self.config.origin
        );

        match self.stage_core().await {
            Ok(report) => {
                self.state = WorkerState::Installed;
                if self.config.skip_waiting_on_install {
                    self.skip_waiting = true;
                }
                self.journal
                    .record(
                        "install.completed",
                        serde_json::json!({ "staged": report.staged.len() }),
                    )
                    .await;
                Ok(report)
            }
            Err(e) => {
                self.state = WorkerState::InstallFailed;
                warn!("Install failed: {}", e);
                self.journal
                    .record("install.failed", serde_json::json!({ "reason": e.to_string() }))
                    .await;
                Err(e)
            }
        }
    }

    async fn stage_core(&self) -> ShellkeepResult<InstallReport> {
        // Staging only ever holds the install in progress.
        if self.storage.delete(&self.names.staging).await? {
            debug!("Discarded earlier staged install in {}", self.names.staging);
        }

        let origin = &self.config.origin;
        let requests = self
            .config
            .manifest
            .core
            .iter()
            .map(|path| FetchRequest::reload(origin.url_for(path)))
            .collect();

        let entries = fetch_all(&self.fetcher, requests, self.config.concurrency, &|url| {
            debug!("Fetched {}", url);
        })
        .await?;

        let staging = StagingPartition::new(self.storage.open(&self.names.staging).await?);
        staging.stage(&entries).await?;

        let mut staged: Vec<String> = entries
            .iter()
            .filter_map(|(url, _)| origin.storage_key(url).map(|k| k.to_string()))
            .collect();
        staged.sort();

        Ok(InstallReport { staged })
    }

    /// Reconcile the content partition with the current manifest.
    ///
    /// Failures are not returned: they delete all three partitions and
    /// yield [`ActivationOutcome::Reset`]. An `Err` means the reset itself
    /// could not be completed.
    pub async fn activate(&mut self) -> ShellkeepResult<ActivationOutcome> {
        if self.state != WorkerState::Installed {
            debug!("Activating from state {}", self.state);
        }
        self.state = WorkerState::Activating;

        match self.reconcile_partitions().await {
            Ok(outcome) => {
                self.state = WorkerState::Ready;
                self.skip_waiting = false;
                self.clients_claimed = true;

                let report = outcome.report().cloned().unwrap_or_default();
                self.journal
                    .record(
                        outcome.event_name(),
                        serde_json::json!({
                            "evicted": report.evicted.len(),
                            "retained": report.retained.len(),
                            "staged": report.staged.len(),
                        }),
                    )
                    .await;
                Ok(outcome)
            }
            Err(e) => {
                let failure = ShellkeepError::ActivationFailure(e.to_string());
                error!("{}; clearing offline cache", failure);

                self.state = WorkerState::Corrupted;
                self.journal
                    .record("activate.reset", serde_json::json!({ "reason": e.to_string() }))
                    .await;
                self.clear_partitions().await?;

                Ok(ActivationOutcome::Reset {
                    reason: failure.to_string(),
                })
            }
        }
    }

    async fn reconcile_partitions(&self) -> ShellkeepResult<ActivationOutcome> {
        let partitions = Partitions::open(&self.storage, &self.names).await?;
        reconcile(
            &self.storage,
            &self.names,
            partitions,
            &self.config.manifest.resources,
            &self.config.origin,
        )
        .await
    }

    /// Delete all three partitions
    pub async fn clear_partitions(&self) -> ShellkeepResult<usize> {
        delete_partitions(&self.storage, &self.names).await
    }

    /// Serve an intercepted request.
    ///
    /// Only GET requests for manifest resources of this origin are handled.
    /// The root document is fetched network-first with a cached fallback;
    /// everything else is served cache-first and cached lazily.
    pub async fn handle_fetch(&self, request: &FetchRequest) -> ShellkeepResult<FetchOutcome> {
        if request.method != Method::Get {
            return Ok(FetchOutcome::Passthrough);
        }

        let Some(key) = self.config.origin.key_for_url(&request.url) else {
            return Ok(FetchOutcome::Passthrough);
        };

        if !self.config.manifest.resources.contains(key.as_str()) {
            debug!("Not a manifest resource: {}", key);
            return Ok(FetchOutcome::Passthrough);
        }

        let url = self.config.origin.url_for(key.as_str());
        if key.is_root() {
            self.online_first(key, &url).await
        } else {
            self.cache_first(key, request, &url).await
        }
    }

    async fn online_first(&self, key: RequestKey, url: &str) -> ShellkeepResult<FetchOutcome> {
        match self.fetcher.fetch(&FetchRequest::get(url)).await {
            Ok(response) => {
                self.remember(url, &response).await;
                Ok(FetchOutcome::Responded {
                    key,
                    response,
                    source: ResponseSource::Network,
                })
            }
            Err(network_error) => match self.cached(url).await {
                Some(response) => {
                    debug!("Serving {} from cache: {}", url, network_error);
                    Ok(FetchOutcome::Responded {
                        key,
                        response,
                        source: ResponseSource::Cache,
                    })
                }
                None => Err(network_error),
            },
        }
    }

    async fn cache_first(
        &self,
        key: RequestKey,
        request: &FetchRequest,
        url: &str,
    ) -> ShellkeepResult<FetchOutcome> {
        if let Some(response) = self.cached(url).await {
            return Ok(FetchOutcome::Responded {
                key,
                response,
                source: ResponseSource::Cache,
            });
        }

        let response = self.fetcher.fetch(&FetchRequest::get(&request.url)).await?;
        if response.is_ok() {
            self.remember(url, &response).await;
        }

        Ok(FetchOutcome::Responded {
            key,
            response,
            source: ResponseSource::Network,
        })
    }

    async fn content(&self) -> ShellkeepResult<ContentPartition<S::Store>> {
        Ok(ContentPartition::new(
            self.storage.open(&self.names.content).await?,
        ))
    }

    /// Content lookup; storage errors count as a miss
    async fn cached(&self, url: &str) -> Option<CachedResponse> {
        let found = match self.content().await {
            Ok(content) => content.get(url).await,
            Err(e) => Err(e),
        };
        match found {
            Ok(found) => found,
            Err(e) => {
                warn!("Cache lookup for {} failed: {}", url, e);
                None
            }
        }
    }

    /// Content write; storage errors are logged and dropped
    async fn remember(&self, url: &str, response: &CachedResponse) {
        let written = match self.content().await {
            Ok(content) => content.put(url, response).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            warn!("Failed to cache {}: {}", url, e);
        }
    }

    /// Handle a raw control message from a client
    pub async fn handle_message(&mut self, raw: &str) -> ShellkeepResult<MessageOutcome> {
        match ControlMessage::parse(raw) {
            Some(ControlMessage::SkipWaiting) => {
                info!("Skip waiting requested");
                self.skip_waiting = true;
                Ok(MessageOutcome::SkipWaiting)
            }
            Some(ControlMessage::DownloadOffline) => {
                let fetched = self.download_offline().await?;
                Ok(MessageOutcome::Downloaded(fetched))
            }
            None => {
                debug!("Ignoring unknown message {:?}", raw);
                Ok(MessageOutcome::Ignored)
            }
        }
    }

    /// Manifest keys that have no entry in the content partition
    pub async fn missing_keys(&self) -> ShellkeepResult<Vec<String>> {
        let origin = &self.config.origin;
        let cached: HashSet<RequestKey> = if self.storage.has(&self.names.content).await? {
            self.content()
                .await?
                .keys()
                .await?
                .iter()
                .filter_map(|url| origin.storage_key(url))
                .collect()
        } else {
            HashSet::new()
        };

        Ok(self
            .config
            .manifest
            .resources
            .keys()
            .filter(|key| !cached.contains(&RequestKey::new(*key)))
            .map(str::to_string)
            .collect())
    }

    /// Fetch and store every manifest resource not yet cached
    pub async fn download_offline(&self) -> ShellkeepResult<Vec<String>> {
        self.download_offline_with(&|_| {}).await
    }

    /// Like [`download_offline`](Self::download_offline), reporting each
    /// fetched URL to `on_fetched`
    pub async fn download_offline_with(
        &self,
        on_fetched: &(dyn Fn(&str) + Send + Sync),
    ) -> ShellkeepResult<Vec<String>> {
        let missing = self.missing_keys().await?;
        if missing.is_empty() {
            debug!("Every resource is already cached");
            return Ok(missing);
        }

        info!("Downloading {} resources for offline use", missing.len());
        let requests = missing
            .iter()
            .map(|key| FetchRequest::get(self.config.origin.url_for(key)))
            .collect();
        let entries = fetch_all(&self.fetcher, requests, self.config.concurrency, on_fetched).await?;

        self.content().await?.put_all(&entries).await?;

        self.journal
            .record("offline.downloaded", serde_json::json!({ "fetched": missing.len() }))
            .await;
        Ok(missing)
    }

    /// Inspect partitions without creating any
    pub async fn status(&self) -> ShellkeepResult<CacheStatus> {
        let content_entries = self.entry_count(&self.names.content).await?;
        let staged_entries = self.entry_count(&self.names.staging).await?;

        let stored = if self.storage.has(&self.names.manifest).await? {
            ManifestPartition::new(self.storage.open(&self.names.manifest).await?)
                .load()
                .await?
        } else {
            None
        };

        Ok(CacheStatus {
            partitions: self.names.clone(),
            origin: self.config.origin.to_string(),
            resources: self.config.manifest.resources.len(),
            core: self.config.manifest.core.len(),
            content_entries,
            staged_entries,
            has_stored_manifest: stored.is_some(),
            diff: stored.map(|stored| self.config.manifest.resources.diff(&stored)),
            missing: self.missing_keys().await?,
        })
    }

    async fn entry_count(&self, name: &str) -> ShellkeepResult<usize> {
        if !self.storage.has(name).await? {
            return Ok(0);
        }
        Ok(self.storage.open(name).await?.keys().await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{CoreAssets, ResourceManifest};
    use crate::net::testing::ScriptedFetcher;
    use crate::store::{DiskStorage, MemoryStorage};
    use tempfile::TempDir;

    const ORIGIN: &str = "https://app.test";

    fn url(key: &str) -> String {
        Origin::parse(ORIGIN).unwrap().url_for(key)
    }

    fn app(resources: &[(&str, &str)], core: &[&str]) -> AppManifest {
        AppManifest::new(
            ResourceManifest::new(resources.iter().copied()),
            CoreAssets::new(core.iter().copied()),
        )
        .unwrap()
    }

    fn manager(
        storage: &MemoryStorage,
        fetcher: ScriptedFetcher,
        app: AppManifest,
    ) -> CacheManager<MemoryStorage, ScriptedFetcher> {
        let config = ManagerConfig::new(Origin::parse(ORIGIN).unwrap(), app);
        CacheManager::new(config, storage.clone(), fetcher)
    }

    /// Pretend a previous version already activated
    async fn seed(storage: &MemoryStorage, stored: &[(&str, &str)], content: &[(&str, &str)]) {
        let names = PartitionNames::default();
        ManifestPartition::new(storage.open(&names.manifest).await.unwrap())
            .save(&ResourceManifest::new(stored.iter().copied()))
            .await
            .unwrap();
        let partition = storage.open(&names.content).await.unwrap();
        for (key, body) in content {
            partition.put(&url(key), &CachedResponse::ok(*body)).await.unwrap();
        }
    }

    async fn content_keys(storage: &MemoryStorage) -> Vec<String> {
        let store = storage.open(&PartitionNames::default().content).await.unwrap();
        store.keys().await.unwrap()
    }

    async fn content_body(storage: &MemoryStorage, key: &str) -> Option<Vec<u8>> {
        let store = storage.open(&PartitionNames::default().content).await.unwrap();
        store.get(&url(key)).await.unwrap().map(|r| r.body)
    }

    async fn stored_manifest(storage: &MemoryStorage) -> Option<ResourceManifest> {
        let store = storage.open(&PartitionNames::default().manifest).await.unwrap();
        ManifestPartition::new(store).load().await.unwrap()
    }

    fn flutter_fetcher() -> ScriptedFetcher {
        ScriptedFetcher::new()
            .with_ok(&url("/"), "<html>")
            .with_ok(&url("main.dart.js"), "main()")
            .with_ok(&url("assets/logo.png"), "png")
    }

    fn flutter_app() -> AppManifest {
        app(
            &[("/", "r1"), ("main.dart.js", "m1"), ("assets/logo.png", "l1")],
            &["/", "main.dart.js"],
        )
    }

    #[tokio::test]
    async fn first_install_content_is_exactly_core() {
        let storage = MemoryStorage::new();
        // Leftovers without a stored manifest are not trusted.
        let leftover = storage.open("flutter-app-cache").await.unwrap();
        leftover
            .put(&url("stale.js"), &CachedResponse::ok("old"))
            .await
            .unwrap();

        let mut manager = manager(&storage, flutter_fetcher(), flutter_app());
        let report = manager.install().await.unwrap();
        assert_eq!(report.staged, vec!["/", "main.dart.js"]);
        assert_eq!(manager.state(), WorkerState::Installed);

        let outcome = manager.activate().await.unwrap();
        let ActivationOutcome::FirstInstall(report) = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert!(report.evicted.is_empty());

        assert_eq!(content_keys(&storage).await, vec![url("/"), url("main.dart.js")]);
        assert_eq!(stored_manifest(&storage).await, Some(flutter_app().resources));
        assert!(!storage.has("flutter-temp-cache").await.unwrap());
        assert_eq!(manager.state(), WorkerState::Ready);
        assert!(manager.clients_claimed());
    }

    #[tokio::test]
    async fn resume_detects_staged_install() {
        let storage = MemoryStorage::new();
        let mut first = manager(&storage, flutter_fetcher(), flutter_app());
        assert_eq!(first.resume().await.unwrap(), WorkerState::Parsed);
        first.install().await.unwrap();

        let mut second = manager(&storage, flutter_fetcher(), flutter_app());
        assert_eq!(second.resume().await.unwrap(), WorkerState::Installed);
        assert!(second.is_waiting());

        let outcome = second.activate().await.unwrap();
        assert_eq!(outcome.report().unwrap().staged, vec!["/", "main.dart.js"]);
    }

    #[tokio::test]
    async fn install_bypasses_http_cache() {
        let storage = MemoryStorage::new();
        let mut manager = manager(&storage, flutter_fetcher(), flutter_app());
        manager.install().await.unwrap();

        let requests = manager.fetcher().requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.bypass_cache));
    }

    #[tokio::test]
    async fn upgrade_retains_unchanged_entries() {
        let storage = MemoryStorage::new();
        seed(&storage, &[("a", "h1"), ("b", "h2")], &[("a", "old-a"), ("b", "old-b")]).await;

        let fetcher = ScriptedFetcher::new().with_ok(&url("c"), "fresh-c");
        let mut manager = manager(&storage, fetcher, app(&[("a", "h1"), ("c", "h3")], &["c"]));
        manager.install().await.unwrap();

        let outcome = manager.activate().await.unwrap();
        let ActivationOutcome::Upgraded(report) = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert_eq!(report.evicted, vec!["b"]);
        assert_eq!(report.retained, vec!["a"]);
        assert_eq!(report.staged, vec!["c"]);

        assert_eq!(content_body(&storage, "a").await.unwrap(), b"old-a");
        assert!(content_body(&storage, "b").await.is_none());
        assert_eq!(content_body(&storage, "c").await.unwrap(), b"fresh-c");
        assert_eq!(
            stored_manifest(&storage).await,
            Some(ResourceManifest::new([("a", "h1"), ("c", "h3")]))
        );
    }

    #[tokio::test]
    async fn fingerprint_change_evicts() {
        let storage = MemoryStorage::new();
        seed(&storage, &[("a", "h1"), ("b", "h1")], &[("a", "v1"), ("b", "v1")]).await;

        let fetcher = ScriptedFetcher::new().with_ok(&url("a"), "v2");
        let mut manager = manager(&storage, fetcher, app(&[("a", "h2"), ("b", "h2")], &["a"]));
        manager.install().await.unwrap();

        let outcome = manager.activate().await.unwrap();
        let report = outcome.report().unwrap();
        assert_eq!(report.evicted, vec!["a", "b"]);
        assert_eq!(report.staged, vec!["a"]);

        assert_eq!(content_body(&storage, "a").await.unwrap(), b"v2");
        // Changed but not core: gone until requested again.
        assert!(content_body(&storage, "b").await.is_none());
    }

    #[tokio::test]
    async fn foreign_content_entries_are_evicted() {
        let storage = MemoryStorage::new();
        seed(&storage, &[("a", "h1")], &[("a", "v1")]).await;
        let content = storage.open("flutter-app-cache").await.unwrap();
        content
            .put("https://cdn.test/font.woff", &CachedResponse::ok("font"))
            .await
            .unwrap();

        let mut manager = manager(&storage, ScriptedFetcher::new(), app(&[("a", "h1")], &[]));
        manager.install().await.unwrap();
        let outcome = manager.activate().await.unwrap();

        assert_eq!(outcome.report().unwrap().evicted, vec!["https://cdn.test/font.woff"]);
        assert_eq!(content_keys(&storage).await, vec![url("a")]);
    }

    #[tokio::test]
    async fn install_failure_stages_nothing() {
        let storage = MemoryStorage::new();
        let fetcher = ScriptedFetcher::new().with_ok(&url("/"), "<html>");
        let mut manager = manager(&storage, fetcher, flutter_app());

        let err = manager.install().await.unwrap_err();
        assert!(matches!(err, ShellkeepError::FetchStatus { status: 404, .. }));
        assert!(err.is_retryable());
        assert_eq!(manager.state(), WorkerState::InstallFailed);
        assert!(!storage.has("flutter-temp-cache").await.unwrap());

        manager.fetcher().set_ok(&url("main.dart.js"), "main()");
        manager.install().await.unwrap();
        assert_eq!(manager.state(), WorkerState::Installed);
    }

    #[tokio::test]
    async fn reinstall_discards_unactivated_staging() {
        let storage = MemoryStorage::new();
        let v1 = ScriptedFetcher::new()
            .with_ok(&url("main.dart.js"), "main v1")
            .with_ok(&url("old.js"), "old");
        let mut first = manager(
            &storage,
            v1,
            app(&[("main.dart.js", "m1"), ("old.js", "o1")], &["main.dart.js", "old.js"]),
        );
        first.install().await.unwrap();

        // A newer build installs before the first one was ever activated
        let v2 = ScriptedFetcher::new().with_ok(&url("main.dart.js"), "main v2");
        let mut second = manager(&storage, v2, app(&[("main.dart.js", "m2")], &["main.dart.js"]));
        second.install().await.unwrap();

        let outcome = second.activate().await.unwrap();
        assert_eq!(outcome.report().unwrap().staged, vec!["main.dart.js"]);
        assert_eq!(content_keys(&storage).await, vec![url("main.dart.js")]);
        assert_eq!(content_body(&storage, "main.dart.js").await.unwrap(), b"main v2");
    }

    #[tokio::test]
    async fn staged_entries_outside_manifest_are_dropped() {
        let storage = MemoryStorage::new();
        let mut manager = manager(&storage, flutter_fetcher(), flutter_app());
        manager.install().await.unwrap();

        let staging = storage.open("flutter-temp-cache").await.unwrap();
        staging
            .put(&url("removed.js"), &CachedResponse::ok("gone"))
            .await
            .unwrap();

        let outcome = manager.activate().await.unwrap();
        assert_eq!(outcome.report().unwrap().staged, vec!["/", "main.dart.js"]);
        assert!(content_body(&storage, "removed.js").await.is_none());
        assert!(!storage.has("flutter-temp-cache").await.unwrap());
    }

    #[tokio::test]
    async fn disk_backed_upgrade_across_processes() {
        let dir = TempDir::new().unwrap();
        let disk_manager = |fetcher: ScriptedFetcher, app: AppManifest| {
            let config = ManagerConfig::new(Origin::parse(ORIGIN).unwrap(), app);
            CacheManager::new(config, DiskStorage::new(dir.path()), fetcher)
        };

        let v1 = ScriptedFetcher::new()
            .with_ok(&url("a"), "a1")
            .with_ok(&url("b"), "b1");
        let mut first = disk_manager(v1, app(&[("a", "h1"), ("b", "h2")], &["a", "b"]));
        first.install().await.unwrap();
        assert!(matches!(
            first.activate().await.unwrap(),
            ActivationOutcome::FirstInstall(_)
        ));

        // Stage in one process, activate in the next
        let v2 = || app(&[("a", "h1"), ("c", "h3")], &["c"]);
        let mut installer = disk_manager(ScriptedFetcher::new().with_ok(&url("c"), "c1"), v2());
        installer.install().await.unwrap();

        let mut activator = disk_manager(ScriptedFetcher::new(), v2());
        assert_eq!(activator.resume().await.unwrap(), WorkerState::Installed);
        let outcome = activator.activate().await.unwrap();
        let ActivationOutcome::Upgraded(report) = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert_eq!(report.evicted, vec!["b"]);
        assert_eq!(report.retained, vec!["a"]);
        assert_eq!(report.staged, vec!["c"]);

        let storage = DiskStorage::new(dir.path());
        assert!(!storage.has("flutter-temp-cache").await.unwrap());
        let content = storage.open("flutter-app-cache").await.unwrap();
        assert_eq!(content.keys().await.unwrap(), vec![url("a"), url("c")]);
        assert_eq!(content.get(&url("a")).await.unwrap().unwrap().body, b"a1");
        assert_eq!(content.get(&url("c")).await.unwrap().unwrap().body, b"c1");

        // Served offline straight from disk
        activator.fetcher().set_offline(true);
        let outcome = activator.handle_fetch(&FetchRequest::get(url("c"))).await.unwrap();
        let FetchOutcome::Responded { response, source, .. } = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert_eq!(source, ResponseSource::Cache);
        assert_eq!(response.body, b"c1");
    }

    #[tokio::test]
    async fn activation_failure_resets_all_partitions() {
        let storage = MemoryStorage::new();
        seed(&storage, &[], &[("main.dart.js", "old")]).await;
        let manifest_store = storage.open("flutter-app-manifest").await.unwrap();
        manifest_store
            .put("manifest", &CachedResponse::ok("{not json"))
            .await
            .unwrap();

        let mut manager = manager(&storage, flutter_fetcher(), flutter_app());
        manager.install().await.unwrap();

        let outcome = manager.activate().await.unwrap();
        assert!(matches!(outcome, ActivationOutcome::Reset { .. }));
        assert_eq!(manager.state(), WorkerState::Corrupted);
        for name in PartitionNames::default().all() {
            assert!(!storage.has(name).await.unwrap(), "{name} survived the reset");
        }

        // Recovery is a fresh install.
        manager.install().await.unwrap();
        let outcome = manager.activate().await.unwrap();
        assert!(matches!(outcome, ActivationOutcome::FirstInstall(_)));
    }

    #[tokio::test]
    async fn root_request_is_network_first() {
        let storage = MemoryStorage::new();
        let mut manager = manager(&storage, flutter_fetcher(), flutter_app());
        manager.install().await.unwrap();
        manager.activate().await.unwrap();

        manager.fetcher().set_ok(&url("/"), "<html v2>");
        let outcome = manager
            .handle_fetch(&FetchRequest::get("https://app.test/#/projects"))
            .await
            .unwrap();

        let FetchOutcome::Responded { key, response, source } = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert!(key.is_root());
        assert_eq!(source, ResponseSource::Network);
        assert_eq!(response.body, b"<html v2>");
        assert_eq!(content_body(&storage, "/").await.unwrap(), b"<html v2>");
        assert_eq!(manager.fetcher().request_count(&url("/")), 2);
    }

    #[tokio::test]
    async fn root_falls_back_to_cache_when_offline() {
        let storage = MemoryStorage::new();
        let mut manager = manager(&storage, flutter_fetcher(), flutter_app());
        manager.install().await.unwrap();
        manager.activate().await.unwrap();

        manager.fetcher().set_offline(true);
        let outcome = manager.handle_fetch(&FetchRequest::get(url("/"))).await.unwrap();

        let FetchOutcome::Responded { response, source, .. } = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert_eq!(source, ResponseSource::Cache);
        assert_eq!(response.body, b"<html>");
    }

    #[tokio::test]
    async fn root_without_cache_propagates_network_error() {
        let storage = MemoryStorage::new();
        let fetcher = ScriptedFetcher::new().with_unreachable(&url("/"));
        let manager = manager(&storage, fetcher, flutter_app());

        let err = manager
            .handle_fetch(&FetchRequest::get(ORIGIN))
            .await
            .unwrap_err();
        assert!(matches!(err, ShellkeepError::FetchFailure { .. }));
    }

    #[tokio::test]
    async fn cache_busting_query_is_stripped() {
        let storage = MemoryStorage::new();
        let fetcher = ScriptedFetcher::new().with_ok("https://app.test/main.dart.js?v=123", "main()");
        let manager = manager(&storage, fetcher, flutter_app());

        let busted = manager
            .handle_fetch(&FetchRequest::get("https://app.test/main.dart.js?v=123"))
            .await
            .unwrap();
        assert!(matches!(
            busted,
            FetchOutcome::Responded { source: ResponseSource::Network, .. }
        ));
        assert_eq!(content_keys(&storage).await, vec![url("main.dart.js")]);

        let plain = manager
            .handle_fetch(&FetchRequest::get(url("main.dart.js")))
            .await
            .unwrap();
        let FetchOutcome::Responded { response, source, .. } = plain else {
            panic!("unexpected outcome {plain:?}");
        };
        assert_eq!(source, ResponseSource::Cache);
        assert_eq!(response.body, b"main()");
        assert_eq!(manager.fetcher().requests().len(), 1);
    }

    #[tokio::test]
    async fn error_responses_are_served_but_not_cached() {
        let storage = MemoryStorage::new();
        let manager = manager(&storage, ScriptedFetcher::new(), flutter_app());

        let outcome = manager
            .handle_fetch(&FetchRequest::get(url("assets/logo.png")))
            .await
            .unwrap();
        let FetchOutcome::Responded { response, .. } = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert_eq!(response.status, 404);
        assert!(content_keys(&storage).await.is_empty());
    }

    #[tokio::test]
    async fn unmatched_requests_pass_through() {
        let storage = MemoryStorage::new();
        let manager = manager(&storage, flutter_fetcher(), flutter_app());

        let post = FetchRequest {
            method: Method::Post,
            ..FetchRequest::get(url("main.dart.js"))
        };
        for request in [
            post,
            FetchRequest::get("https://cdn.test/main.dart.js"),
            FetchRequest::get(url("api/projects")),
        ] {
            let outcome = manager.handle_fetch(&request).await.unwrap();
            assert_eq!(outcome, FetchOutcome::Passthrough, "{}", request.url);
        }
        assert!(manager.fetcher().requests().is_empty());
    }

    #[tokio::test]
    async fn download_offline_is_idempotent() {
        let storage = MemoryStorage::new();
        let mut manager = manager(&storage, flutter_fetcher(), flutter_app());
        manager.install().await.unwrap();
        manager.activate().await.unwrap();
        manager.fetcher().clear_requests();

        let first = manager.download_offline().await.unwrap();
        assert_eq!(first, vec!["assets/logo.png"]);
        let keys_after_first = content_keys(&storage).await;

        let second = manager.download_offline().await.unwrap();
        assert!(second.is_empty());
        assert_eq!(content_keys(&storage).await, keys_after_first);
        assert_eq!(manager.fetcher().request_count(&url("assets/logo.png")), 1);
        assert_eq!(manager.fetcher().requests().len(), 1);
    }

    #[tokio::test]
    async fn control_messages() {
        let storage = MemoryStorage::new();
        let config = ManagerConfig::new(Origin::parse(ORIGIN).unwrap(), flutter_app())
            .with_skip_waiting_on_install(false);
        let mut manager = CacheManager::new(config, storage.clone(), flutter_fetcher());

        assert_eq!(manager.handle_message("bogus").await.unwrap(), MessageOutcome::Ignored);
        assert!(!manager.skip_waiting_requested());

        assert_eq!(
            manager.handle_message("skipWaiting").await.unwrap(),
            MessageOutcome::SkipWaiting
        );
        assert!(manager.skip_waiting_requested());

        let outcome = manager.handle_message("downloadOffline").await.unwrap();
        let MessageOutcome::Downloaded(mut fetched) = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        fetched.sort();
        assert_eq!(fetched, vec!["/", "assets/logo.png", "main.dart.js"]);
    }

    #[tokio::test]
    async fn status_does_not_create_partitions() {
        let storage = MemoryStorage::new();
        let manager = manager(&storage, flutter_fetcher(), flutter_app());

        let status = manager.status().await.unwrap();
        assert_eq!(status.resources, 3);
        assert_eq!(status.core, 2);
        assert_eq!(status.content_entries, 0);
        assert!(!status.has_stored_manifest);
        assert!(status.diff.is_none());
        assert_eq!(status.missing.len(), 3);
        for name in PartitionNames::default().all() {
            assert!(!storage.has(name).await.unwrap());
        }
    }

    #[tokio::test]
    async fn status_after_activation() {
        let storage = MemoryStorage::new();
        let mut manager = manager(&storage, flutter_fetcher(), flutter_app());
        manager.install().await.unwrap();
        manager.activate().await.unwrap();

        let status = manager.status().await.unwrap();
        assert_eq!(status.content_entries, 2);
        assert_eq!(status.staged_entries, 0);
        assert!(status.has_stored_manifest);
        assert!(status.diff.unwrap().is_empty());
        assert_eq!(status.missing, vec!["assets/logo.png"]);
    }

    #[tokio::test]
    async fn clear_removes_existing_partitions() {
        let storage = MemoryStorage::new();
        let mut manager = manager(&storage, flutter_fetcher(), flutter_app());
        manager.install().await.unwrap();
        manager.activate().await.unwrap();

        // Staging was already drained by activation.
        assert_eq!(manager.clear_partitions().await.unwrap(), 2);
        assert_eq!(manager.clear_partitions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn lifecycle_is_journaled() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal.log");
        let storage = MemoryStorage::new();
        let mut manager =
            manager(&storage, flutter_fetcher(), flutter_app()).with_journal(Journal::at(&path));

        manager.install().await.unwrap();
        manager.activate().await.unwrap();
        manager.download_offline().await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let events: Vec<String> = content
            .lines()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                value["event"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(
            events,
            vec!["install.completed", "activate.first_install", "offline.downloaded"]
        );
    }
}
