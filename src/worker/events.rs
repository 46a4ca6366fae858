//! Worker event interface
//!
//! Decouples the cache manager from whatever delivers install, activate,
//! fetch and message events. A host implements the delivery side and
//! feeds events through an [`EventDispatcher`].

use super::{ActivationOutcome, CacheManager, FetchOutcome, InstallReport, MessageOutcome};
use crate::error::ShellkeepResult;
use crate::net::{FetchRequest, Fetcher};
use crate::store::CacheStorage;
use async_trait::async_trait;
use tracing::debug;

/// An event delivered to a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(FetchRequest),
    Message(String),
}

/// Handler with one method per event kind
#[async_trait]
pub trait ServiceWorkerHandler: Send + Sync {
    async fn on_install(&mut self) -> ShellkeepResult<InstallReport>;

    async fn on_activate(&mut self) -> ShellkeepResult<ActivationOutcome>;

    async fn on_fetch(&self, request: &FetchRequest) -> ShellkeepResult<FetchOutcome>;

    async fn on_message(&mut self, message: &str) -> ShellkeepResult<MessageOutcome>;

    /// Installed but not yet activated
    fn is_waiting(&self) -> bool;

    /// Whether a waiting worker asked to activate immediately
    fn skip_waiting_requested(&self) -> bool;
}

#[async_trait]
impl<S, F> ServiceWorkerHandler for CacheManager<S, F>
where
    S: CacheStorage,
    F: Fetcher,
{
    async fn on_install(&mut self) -> ShellkeepResult<InstallReport> {
        self.install().await
    }

    async fn on_activate(&mut self) -> ShellkeepResult<ActivationOutcome> {
        self.activate().await
    }

    async fn on_fetch(&self, request: &FetchRequest) -> ShellkeepResult<FetchOutcome> {
        self.handle_fetch(request).await
    }

    async fn on_message(&mut self, message: &str) -> ShellkeepResult<MessageOutcome> {
        self.handle_message(message).await
    }

    fn is_waiting(&self) -> bool {
        CacheManager::is_waiting(self)
    }

    fn skip_waiting_requested(&self) -> bool {
        CacheManager::skip_waiting_requested(self)
    }
}

/// What dispatching an event did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Installed {
        report: InstallReport,
        /// Set when the worker activated right after installing
        activation: Option<ActivationOutcome>,
    },
    Activated(ActivationOutcome),
    Fetched(FetchOutcome),
    Message {
        outcome: MessageOutcome,
        /// Set when the message released a waiting worker
        activation: Option<ActivationOutcome>,
    },
}

/// Feeds events to a handler.
///
/// A waiting worker that has skip-waiting set is activated as soon as
/// either install finishes or the flag is set by a message.
pub struct EventDispatcher<H> {
    handler: H,
}

impl<H: ServiceWorkerHandler> EventDispatcher<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub async fn dispatch(&mut self, event: WorkerEvent) -> ShellkeepResult<EventOutcome> {
        match event {
            WorkerEvent::Install => {
                let report = self.handler.on_install().await?;
                let activation = self.activate_if_released().await?;
                Ok(EventOutcome::Installed { report, activation })
            }
            WorkerEvent::Activate => Ok(EventOutcome::Activated(self.handler.on_activate().await?)),
            WorkerEvent::Fetch(request) => {
                Ok(EventOutcome::Fetched(self.handler.on_fetch(&request).await?))
            }
            WorkerEvent::Message(message) => {
                let outcome = self.handler.on_message(&message).await?;
                let activation = self.activate_if_released().await?;
                Ok(EventOutcome::Message {
                    outcome,
                    activation,
                })
            }
        }
    }

    async fn activate_if_released(&mut self) -> ShellkeepResult<Option<ActivationOutcome>> {
        if !(self.handler.is_waiting() && self.handler.skip_waiting_requested()) {
            return Ok(None);
        }
        debug!("Skipping the waiting phase");
        Ok(Some(self.handler.on_activate().await?))
    }
}
