//! Activation-time reconciliation of the content partition

use crate::error::ShellkeepResult;
use crate::key::Origin;
use crate::manifest::ResourceManifest;
use crate::store::{CacheStorage, ContentPartition, PartitionNames, Partitions};
use serde::Serialize;
use tracing::{debug, info, warn};

/// What an activation did to the content partition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    /// Content entries deleted because they were removed or changed
    pub evicted: Vec<String>,
    /// Content entries kept from the previous version
    pub retained: Vec<String>,
    /// Entries copied over from the staging partition
    pub staged: Vec<String>,
}

/// Result of an activation attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivationOutcome {
    /// No previous manifest: content rebuilt from staging
    FirstInstall(ActivationReport),
    /// Previous manifest found: unchanged entries retained
    Upgraded(ActivationReport),
    /// Reconciliation failed and every partition was deleted
    Reset { reason: String },
}

impl ActivationOutcome {
    /// Journal event name for this outcome
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::FirstInstall(_) => "activate.first_install",
            Self::Upgraded(_) => "activate.upgraded",
            Self::Reset { .. } => "activate.reset",
        }
    }

    /// Reconciliation report, absent after a reset
    pub fn report(&self) -> Option<&ActivationReport> {
        match self {
            Self::FirstInstall(report) | Self::Upgraded(report) => Some(report),
            Self::Reset { .. } => None,
        }
    }
}

/// Bring the content partition in line with `current`.
///
/// Without a stored manifest the content partition is dropped and rebuilt
/// from staging. Otherwise every content entry whose key left the manifest
/// or whose fingerprint changed since the stored manifest is evicted before
/// staged entries are copied over. Staged entries whose key is not in
/// `current` are dropped. Either way staging is deleted and `current`
/// becomes the stored manifest.
pub async fn reconcile<St>(
    storage: &St,
    names: &PartitionNames,
    partitions: Partitions<St::Store>,
    current: &ResourceManifest,
    origin: &Origin,
) -> ShellkeepResult<ActivationOutcome>
where
    St: CacheStorage + ?Sized,
{
    let Partitions {
        content,
        staging,
        manifest,
    } = partitions;

    let stored = manifest.load().await?;
    let mut report = ActivationReport::default();

    let content = match stored {
        None => {
            info!("No stored manifest, rebuilding {}", names.content);
            drop(content);
            storage.delete(&names.content).await?;
            ContentPartition::new(storage.open(&names.content).await?)
        }
        Some(ref stored) => {
            for url in content.keys().await? {
                let key = origin.storage_key(&url);
                let label = key.as_ref().map(|k| k.to_string()).unwrap_or_else(|| url.clone());

                let unchanged = key.as_ref().is_some_and(|k| {
                    current
                        .fingerprint(k.as_str())
                        .is_some_and(|fp| stored.fingerprint(k.as_str()) == Some(fp))
                });

                if unchanged {
                    report.retained.push(label);
                } else {
                    debug!("Evicting {}", label);
                    content.delete(&url).await?;
                    report.evicted.push(label);
                }
            }
            content
        }
    };

    let (staged, foreign): (Vec<_>, Vec<_>) = staging
        .entries()
        .await?
        .into_iter()
        .partition(|(url, _)| {
            origin
                .storage_key(url)
                .is_some_and(|key| current.contains(key.as_str()))
        });
    for (url, _) in &foreign {
        warn!("Dropping staged {} which is not in the manifest", url);
    }

    content.put_all(&staged).await?;
    report.staged = staged
        .iter()
        .filter_map(|(url, _)| origin.storage_key(url).map(|k| k.to_string()))
        .collect();

    drop(staging);
    storage.delete(&names.staging).await?;
    manifest.save(current).await?;

    info!(
        "Reconciled {}: {} evicted, {} retained, {} staged",
        names.content,
        report.evicted.len(),
        report.retained.len(),
        report.staged.len()
    );

    Ok(match stored {
        None => ActivationOutcome::FirstInstall(report),
        Some(_) => ActivationOutcome::Upgraded(report),
    })
}
