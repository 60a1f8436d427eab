//! Registration
//!
//! Tracks which generation's worker is serving and which one is waiting to
//! take over. A failed install never disturbs the active worker.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::control::{ControlMessage, MessageOutcome};
use super::lifecycle::{Worker, WorkerEvent, WorkerOutcome, WorkerState};
use crate::cache::{CacheStats, CacheStorage, ResponseSnapshot};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::intercept::{fallback, InterceptedRequest};
use crate::network::{fetch_with_timeout, Fetcher};

// == Registration ==
pub struct Registration {
    storage: Arc<CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    stats: Arc<CacheStats>,
    /// Bound on fetches made while no worker is active
    fetch_timeout: Duration,
    active: RwLock<Option<Arc<Worker>>>,
    waiting: RwLock<Option<Arc<Worker>>>,
}

impl Registration {
    // == Constructor ==
    pub fn new(storage: Arc<CacheStorage>, fetcher: Arc<dyn Fetcher>, fetch_timeout: Duration) -> Self {
        Self {
            storage,
            fetcher,
            stats: Arc::new(CacheStats::new()),
            fetch_timeout,
            active: RwLock::new(None),
            waiting: RwLock::new(None),
        }
    }

    pub fn storage(&self) -> &Arc<CacheStorage> {
        &self.storage
    }

    pub fn stats(&self) -> &Arc<CacheStats> {
        &self.stats
    }

    pub async fn active(&self) -> Option<Arc<Worker>> {
        self.active.read().await.clone()
    }

    pub async fn waiting(&self) -> Option<Arc<Worker>> {
        self.waiting.read().await.clone()
    }

    // == Register ==
    /// Installs the generation `config` describes and activates it when
    /// allowed. Returns the new worker's resulting state.
    pub async fn register(&self, config: &Config) -> Result<WorkerState> {
        let worker = Arc::new(Worker::new(
            config,
            self.storage.clone(),
            self.fetcher.clone(),
            self.stats.clone(),
        )?);

        info!(generation = %config.cache_generation, "Installing generation");
        worker.dispatch(WorkerEvent::Install).await?;

        let has_active = self.active.read().await.is_some();
        if worker.skip_waiting_requested() || !has_active {
            self.promote(worker).await?;
            return Ok(WorkerState::Activated);
        }

        let previous = self.waiting.write().await.replace(worker);
        if let Some(previous) = previous {
            previous.mark_redundant().await;
        }
        info!(generation = %config.cache_generation, "Generation installed, waiting");
        Ok(WorkerState::Installed)
    }

    /// Activates `worker` and routes all traffic through it.
    async fn promote(&self, worker: Arc<Worker>) -> Result<()> {
        match worker.dispatch(WorkerEvent::Activate).await? {
            WorkerOutcome::Activated(retired) => {
                debug!(retired = retired.len(), "Activation finished")
            }
            other => {
                return Err(CacheError::Internal(format!(
                    "unexpected activation outcome: {:?}",
                    other
                )))
            }
        }

        // Activation already retired every other generation's namespaces,
        // so an older waiting worker can never take over again.
        let superseded = self.waiting.write().await.take();
        if let Some(superseded) = superseded {
            if !Arc::ptr_eq(&superseded, &worker) {
                debug!(
                    generation = superseded.names().generation(),
                    "Waiting worker superseded"
                );
                superseded.mark_redundant().await;
            }
        }

        let previous = self.active.write().await.replace(worker);
        if let Some(previous) = previous {
            previous.mark_redundant().await;
        }
        Ok(())
    }

    // == Fetch ==
    /// Hands a request to the active worker, or straight to the network
    /// while none is active.
    pub async fn fetch(&self, request: InterceptedRequest) -> ResponseSnapshot {
        let active = self.active().await;
        match active {
            Some(worker) => match worker.dispatch(WorkerEvent::Fetch(request)).await {
                Ok(WorkerOutcome::Response(response)) => response,
                Ok(other) => {
                    warn!(outcome = ?other, "Fetch produced no response");
                    fallback::bad_gateway()
                }
                Err(err) => {
                    warn!(error = %err, "Fetch handler failed");
                    fallback::bad_gateway()
                }
            },
            None => {
                self.stats.record_passthrough();
                fetch_with_timeout(self.fetcher.as_ref(), &request, self.fetch_timeout)
                    .await
                    .unwrap_or_else(|err| {
                        debug!(url = %request.url, error = %err, "Uncontrolled fetch failed");
                        fallback::bad_gateway()
                    })
            }
        }
    }

    // == Post Message ==
    /// Delivers a control message. `SKIP_WAITING` goes to the waiting
    /// worker; `CLEAR_CACHE` to the active one, or the waiting one when
    /// nothing is active yet.
    pub async fn post_message(&self, message: ControlMessage) -> Result<MessageOutcome> {
        info!(message = message.as_str(), "Control message received");

        match message {
            ControlMessage::SkipWaiting => {
                let Some(waiting) = self.waiting().await else {
                    debug!("No waiting worker, SKIP_WAITING ignored");
                    return Ok(MessageOutcome::Ignored);
                };
                let outcome = self.deliver(&waiting, message).await?;
                if waiting.skip_waiting_requested() {
                    self.promote(waiting).await?;
                }
                Ok(outcome)
            }
            ControlMessage::ClearCache => {
                let target = match self.active().await {
                    Some(worker) => Some(worker),
                    None => self.waiting().await,
                };
                match target {
                    Some(worker) => self.deliver(&worker, message).await,
                    None => Ok(MessageOutcome::Ignored),
                }
            }
        }
    }

    async fn deliver(&self, worker: &Worker, message: ControlMessage) -> Result<MessageOutcome> {
        match worker.dispatch(WorkerEvent::Message(message)).await? {
            WorkerOutcome::Message(outcome) => Ok(outcome),
            other => Err(CacheError::Internal(format!(
                "unexpected message outcome: {:?}",
                other
            ))),
        }
    }
}
