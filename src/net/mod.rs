//! Network boundary
//!
//! Everything the cache manager knows about the network goes through the
//! [`Fetcher`] trait, so the lifecycle logic can run against a real origin
//! ([`HttpFetcher`]) or a scripted one in tests.

mod http;
#[cfg(test)]
pub(crate) mod testing;

pub use http::HttpFetcher;

use crate::error::{ShellkeepError, ShellkeepResult};
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use std::fmt;
use tracing::debug;

/// HTTP method of an intercepted request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    /// Parse a method name, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "HEAD" => Some(Self::Head),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        };
        write!(f, "{}", name)
    }
}

/// A request as seen by the cache manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    /// Skip any HTTP cache between us and the origin
    pub bypass_cache: bool,
}

impl FetchRequest {
    /// A plain GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            bypass_cache: false,
        }
    }

    /// A GET request that must reach the origin
    pub fn reload(url: impl Into<String>) -> Self {
        Self {
            bypass_cache: true,
            ..Self::get(url)
        }
    }
}

/// A response body with the metadata needed to replay it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CachedResponse {
    /// A 200 response with the given body
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value with the given name, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Source of network responses
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform a request.
    ///
    /// Transport failures are `FetchFailure`. HTTP error statuses are
    /// returned as responses; callers check [`CachedResponse::is_ok`].
    async fn fetch(&self, request: &FetchRequest) -> ShellkeepResult<CachedResponse>;
}

/// Fetch many URLs with bounded concurrency.
///
/// Fails on the first transport error or non-2xx status, so callers only
/// ever see a complete set of responses. `on_fetched` is called with each
/// URL as its response arrives.
pub async fn fetch_all<F>(
    fetcher: &F,
    requests: Vec<FetchRequest>,
    concurrency: usize,
    on_fetched: &(dyn Fn(&str) + Send + Sync),
) -> ShellkeepResult<Vec<(String, CachedResponse)>>
where
    F: Fetcher + ?Sized,
{
    debug!("Fetching {} resources (concurrency {})", requests.len(), concurrency);

    stream::iter(requests)
        .map(|request| async move {
            let response = fetcher.fetch(&request).await?;
            if !response.is_ok() {
                return Err(ShellkeepError::FetchStatus {
                    url: request.url,
                    status: response.status,
                });
            }
            on_fetched(&request.url);
            Ok((request.url, response))
        })
        .buffer_unordered(concurrency.max(1))
        .try_collect()
        .await
}
