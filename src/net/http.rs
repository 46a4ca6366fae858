//! HTTP fetcher backed by ureq

use super::{CachedResponse, FetchRequest, Fetcher, Method};
use crate::error::{ShellkeepError, ShellkeepResult};
use async_trait::async_trait;
use tracing::debug;
use ureq::Agent;

/// Fetches resources from the origin over HTTP(S)
///
/// ureq is blocking, so each request runs on tokio's blocking pool.
#[derive(Clone)]
pub struct HttpFetcher {
    agent: Agent,
}

impl HttpFetcher {
    /// Create a fetcher that identifies itself with `user_agent`
    pub fn new(user_agent: &str) -> Self {
        let config = Agent::config_builder()
            .user_agent(user_agent)
            .http_status_as_error(false)
            .build();

        Self {
            agent: Agent::new_with_config(config),
        }
    }

    fn fetch_blocking(agent: &Agent, request: &FetchRequest) -> ShellkeepResult<CachedResponse> {
        if request.method != Method::Get {
            return Err(ShellkeepError::fetch(
                &request.url,
                format!("{} requests are not fetched by the cache", request.method),
            ));
        }

        let mut builder = agent.get(&request.url);
        if request.bypass_cache {
            builder = builder
                .header("Cache-Control", "no-cache")
                .header("Pragma", "no-cache");
        }

        let mut response = builder
            .call()
            .map_err(|e| ShellkeepError::fetch(&request.url, e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(|e| ShellkeepError::fetch(&request.url, format!("reading body: {}", e)))?;

        debug!("GET {} -> {} ({} bytes)", request.url, status, body.len());

        Ok(CachedResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> ShellkeepResult<CachedResponse> {
        let agent = self.agent.clone();
        let request = request.clone();
        let url = request.url.clone();

        tokio::task::spawn_blocking(move || Self::fetch_blocking(&agent, &request))
            .await
            .map_err(|e| ShellkeepError::Internal(format!("fetch task for {} failed: {}", url, e)))?
    }
}
