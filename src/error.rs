//! Error types for shellkeep
//!
//! All modules use `ShellkeepResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for shellkeep operations
pub type ShellkeepResult<T> = Result<T, ShellkeepError>;

/// All errors that can occur in shellkeep
#[derive(Error, Debug)]
pub enum ShellkeepError {
    // Network errors
    #[error("Fetch failed for {url}: {reason}")]
    FetchFailure { url: String, reason: String },

    #[error("Fetch for {url} returned HTTP {status}")]
    FetchStatus { url: String, status: u16 },

    // Lifecycle errors
    #[error("Activation failed: {0}")]
    ActivationFailure(String),

    // Manifest errors
    #[error("Invalid manifest at {path}: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },

    #[error("Manifest not found: {0}")]
    ManifestNotFound(PathBuf),

    #[error("No manifest configured")]
    ManifestNotConfigured,

    #[error("Invalid origin '{origin}': {reason}")]
    InvalidOrigin { origin: String, reason: String },

    #[error("No origin configured")]
    OriginNotConfigured,

    // Storage errors
    #[error("Cache partition {partition}: {reason}")]
    Store { partition: String, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl ShellkeepError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a fetch failure for a URL
    pub fn fetch(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FetchFailure {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a storage error for a named partition
    pub fn store(partition: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Store {
            partition: partition.into(),
            reason: reason.into(),
        }
    }

    /// Check if error is retryable
    ///
    /// Fetch failures clear up on their own once the origin is reachable
    /// again, so the next install attempt is expected to succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::FetchFailure { .. } | Self::FetchStatus { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::OriginNotConfigured => {
                Some("Pass --origin or run: shellkeep config set app.origin https://example.com")
            }
            Self::ManifestNotConfigured => Some(
                "Pass --manifest or run: shellkeep config set app.manifest build/web/flutter_service_worker.js",
            ),
            Self::FetchFailure { .. } | Self::FetchStatus { .. } => {
                Some("Check that the origin is reachable, then run: shellkeep install")
            }
            Self::ActivationFailure(_) => Some("Run: shellkeep update"),
            _ => None,
        }
    }
}
