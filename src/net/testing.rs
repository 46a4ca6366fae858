//! Scripted fetcher for tests

use super::{CachedResponse, FetchRequest, Fetcher};
use crate::error::{ShellkeepError, ShellkeepResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Fetcher answering from a fixed table and recording every request.
///
/// Unknown URLs get a 404. Going offline turns every request into a
/// transport failure.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    responses: Mutex<HashMap<String, CachedResponse>>,
    unreachable: Mutex<Vec<String>>,
    offline: AtomicBool,
    requests: Mutex<Vec<FetchRequest>>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_ok(self, url: &str, body: &str) -> Self {
        self.set_ok(url, body);
        self
    }

    pub(crate) fn with_unreachable(self, url: &str) -> Self {
        self.unreachable.lock().unwrap().push(url.to_string());
        self
    }

    pub(crate) fn set_ok(&self, url: &str, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), CachedResponse::ok(body));
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn request_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .count()
    }

    pub(crate) fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &FetchRequest) -> ShellkeepResult<CachedResponse> {
        self.requests.lock().unwrap().push(request.clone());

        if self.offline.load(Ordering::SeqCst)
            || self.unreachable.lock().unwrap().contains(&request.url)
        {
            return Err(ShellkeepError::fetch(&request.url, "network unreachable"));
        }

        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .unwrap_or(CachedResponse {
                status: 404,
                headers: Vec::new(),
                body: b"not found".to_vec(),
            }))
    }
}
