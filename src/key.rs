//! Request key normalization
//!
//! Every cached entry is stored under an absolute URL, while the resource
//! manifest is keyed by origin-relative paths. [`Origin`] converts between
//! the two and applies the navigation and cache-busting rules used when a
//! request is intercepted.

use crate::error::{ShellkeepError, ShellkeepResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Query marker appended to asset URLs for cache busting
const CACHE_BUST_MARKER: &str = "?v=";

/// Manifest key of an intercepted request
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestKey(String);

impl RequestKey {
    /// Key of the root document
    pub const ROOT: &'static str = "/";

    /// Create a key from an origin-relative path
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The root document key
    pub fn root() -> Self {
        Self(Self::ROOT.to_string())
    }

    /// Whether this is the root document key
    pub fn is_root(&self) -> bool {
        self.0 == Self::ROOT
    }

    /// Get the key string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated `scheme://host[:port]` origin without trailing slash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Origin(String);

impl Origin {
    /// Parse and validate an origin string.
    ///
    /// A single trailing slash is tolerated and dropped. Paths, queries and
    /// fragments are rejected so that key derivation stays unambiguous.
    pub fn parse(raw: &str) -> ShellkeepResult<Self> {
        let invalid = |reason: &str| ShellkeepError::InvalidOrigin {
            origin: raw.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = raw.trim();
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);

        let (scheme, authority) = trimmed
            .split_once("://")
            .ok_or_else(|| invalid("expected scheme://host"))?;

        let scheme_ok = !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !scheme_ok {
            return Err(invalid("invalid scheme"));
        }
        if authority.is_empty() {
            return Err(invalid("empty host"));
        }
        if authority.contains(['/', '?', '#']) {
            return Err(invalid("origin must not contain a path, query or fragment"));
        }

        // Scheme and host are case-insensitive; userinfo is not.
        let authority = match authority.rsplit_once('@') {
            Some((userinfo, host)) => format!("{}@{}", userinfo, host.to_ascii_lowercase()),
            None => authority.to_ascii_lowercase(),
        };

        Ok(Self(format!("{}://{}", scheme.to_ascii_lowercase(), authority)))
    }

    /// Get the origin string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Absolute URL for a manifest key
    pub fn url_for(&self, key: &str) -> String {
        if key == RequestKey::ROOT {
            format!("{}/", self.0)
        } else {
            format!("{}/{}", self.0, key.trim_start_matches('/'))
        }
    }

    /// Origin-relative remainder of `url`, or `None` for foreign URLs
    fn relative<'a>(&self, url: &'a str) -> Option<&'a str> {
        let prefix = url.get(..self.0.len())?;
        if !prefix.eq_ignore_ascii_case(&self.0) {
            return None;
        }
        let rest = &url[self.0.len()..];
        if rest.is_empty() {
            return Some("");
        }
        rest.strip_prefix('/')
    }

    /// Effective manifest key for an intercepted request URL.
    ///
    /// Strips a `?v=` cache-busting suffix and maps the bare origin, any
    /// `/#...` navigation and the empty path to the root key. Returns `None`
    /// when the URL does not belong to this origin.
    pub fn key_for_url(&self, url: &str) -> Option<RequestKey> {
        let rest = self.relative(url)?;

        let key = match rest.find(CACHE_BUST_MARKER) {
            Some(idx) => &rest[..idx],
            None => rest,
        };

        if key.is_empty() || rest.starts_with('#') {
            return Some(RequestKey::root());
        }

        Some(RequestKey::new(key))
    }

    /// Manifest key of an entry already stored in a partition.
    ///
    /// Stored URLs are already normalized, so only the origin is stripped and
    /// the empty path mapped to the root key.
    pub fn storage_key(&self, url: &str) -> Option<RequestKey> {
        let rest = self.relative(url)?;
        if rest.is_empty() {
            Some(RequestKey::root())
        } else {
            Some(RequestKey::new(rest))
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Origin {
    type Err = ShellkeepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Origin {
    type Error = ShellkeepError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Origin> for String {
    fn from(origin: Origin) -> Self {
        origin.0
    }
}
