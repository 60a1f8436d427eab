//! Lifecycle Controller
//!
//! One `Worker` per cache generation. It precreates the generation's
//! namespaces, fills the static one from the manifest, retires stale
//! generations on activation and then intercepts traffic.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use super::control::{ControlMessage, MessageOutcome};
use crate::cache::{
    CacheNames, CacheStats, CacheStorage, NamespaceKind, RequestKey, ResponseSnapshot,
};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::intercept::{Classifier, InterceptedRequest, Route, StrategyEngine};
use crate::network::{fetch_with_timeout, Fetcher};

// == Worker State ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Created, install not yet started
    Parsed,
    Installing,
    /// Installed and waiting to activate
    Installed,
    Activating,
    Activated,
    /// Failed to install or superseded by a newer generation
    Redundant,
}

// == Events ==
/// Everything a worker reacts to.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(InterceptedRequest),
    Message(ControlMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Install,
    Activate,
    Fetch,
    Message,
}

impl WorkerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            WorkerEvent::Install => EventKind::Install,
            WorkerEvent::Activate => EventKind::Activate,
            WorkerEvent::Fetch(_) => EventKind::Fetch,
            WorkerEvent::Message(_) => EventKind::Message,
        }
    }
}

/// Result of a dispatched event.
#[derive(Debug)]
pub enum WorkerOutcome {
    /// Number of manifest entries stored
    Installed(usize),
    /// Namespaces deleted during rollover
    Activated(Vec<String>),
    Response(ResponseSnapshot),
    Message(MessageOutcome),
}

// == Worker ==
pub struct Worker {
    names: CacheNames,
    origin: Url,
    manifest: Vec<String>,
    auto_skip_waiting: bool,
    fetch_timeout: Duration,
    storage: Arc<CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    classifier: Classifier,
    engine: StrategyEngine,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("names", &self.names)
            .field("origin", &self.origin.as_str())
            .finish_non_exhaustive()
    }
}

impl Worker {
    // == Constructor ==
    pub fn new(
        config: &Config,
        storage: Arc<CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        stats: Arc<CacheStats>,
    ) -> Result<Self> {
        let names = CacheNames::new(&config.cache_prefix, &config.cache_generation);
        let offline_url = config
            .upstream_url
            .join(&config.offline_page)
            .map_err(|e| CacheError::InvalidRequest(format!("offline page: {}", e)))?;

        let engine = StrategyEngine::new(
            storage.clone(),
            fetcher.clone(),
            stats,
            config.fetch_timeout,
            names.name(NamespaceKind::Static),
            RequestKey::get(&offline_url),
        );

        Ok(Self {
            names,
            origin: config.upstream_url.clone(),
            manifest: config.manifest(),
            auto_skip_waiting: config.auto_skip_waiting,
            fetch_timeout: config.fetch_timeout,
            storage,
            fetcher,
            classifier: Classifier::new(&config.api_prefix),
            engine,
            state: RwLock::new(WorkerState::Parsed),
            skip_waiting: AtomicBool::new(false),
        })
    }

    pub fn names(&self) -> &CacheNames {
        &self.names
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    async fn set_state(&self, state: WorkerState) {
        let mut current = self.state.write().await;
        debug!(
            generation = self.names.generation(),
            from = ?*current,
            to = ?state,
            "Worker state change"
        );
        *current = state;
    }

    pub async fn mark_redundant(&self) {
        self.set_state(WorkerState::Redundant).await;
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    // == Dispatch ==
    /// Routes an event to its handler and waits for it to finish.
    pub async fn dispatch(&self, event: WorkerEvent) -> Result<WorkerOutcome> {
        debug!(generation = self.names.generation(), kind = ?event.kind(), "Dispatching event");
        match event {
            WorkerEvent::Install => self.install().await.map(WorkerOutcome::Installed),
            WorkerEvent::Activate => self.activate().await.map(WorkerOutcome::Activated),
            WorkerEvent::Fetch(request) => Ok(WorkerOutcome::Response(self.fetch(&request).await)),
            WorkerEvent::Message(message) => {
                Ok(WorkerOutcome::Message(self.handle_message(message).await))
            }
        }
    }

    // == Install ==
    /// Opens this generation's namespaces and stores the whole manifest.
    ///
    /// Every manifest entry is fetched before any is stored, so a single
    /// failure leaves the static namespace untouched.
    pub async fn install(&self) -> Result<usize> {
        self.set_state(WorkerState::Installing).await;

        match self.precache().await {
            Ok(count) => {
                self.set_state(WorkerState::Installed).await;
                if self.auto_skip_waiting {
                    self.skip_waiting.store(true, Ordering::SeqCst);
                }
                info!(
                    generation = self.names.generation(),
                    entries = count,
                    "Install complete"
                );
                Ok(count)
            }
            Err(err) => {
                self.set_state(WorkerState::Redundant).await;
                warn!(generation = self.names.generation(), error = %err, "Install failed");
                Err(err)
            }
        }
    }

    async fn precache(&self) -> Result<usize> {
        for kind in NamespaceKind::ALL {
            self.storage.open(&self.names.name(kind)).await;
        }

        let requests = self
            .manifest
            .iter()
            .map(|path| {
                self.origin
                    .join(path)
                    .map(InterceptedRequest::get)
                    .map_err(|e| CacheError::Install(format!("{}: {}", path, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        let responses = join_all(
            requests
                .iter()
                .map(|request| fetch_with_timeout(self.fetcher.as_ref(), request, self.fetch_timeout)),
        )
        .await;

        let mut entries = Vec::with_capacity(requests.len());
        for (request, response) in requests.iter().zip(responses) {
            match response {
                Ok(response) if response.is_cacheable() => entries.push((request.key(), response)),
                Ok(response) => {
                    return Err(CacheError::Install(format!(
                        "{} returned {}",
                        request.url, response.status
                    )))
                }
                Err(err) => return Err(CacheError::Install(format!("{}: {}", request.url, err))),
            }
        }

        let target = self.storage.open(&self.names.name(NamespaceKind::Static)).await;
        let count = entries.len();
        for (key, response) in entries {
            target
                .put(key, response)
                .await
                .map_err(|e| CacheError::Install(e.to_string()))?;
        }
        Ok(count)
    }

    // == Activate ==
    /// Deletes every prefixed namespace that is not one of this
    /// generation's three.
    pub async fn activate(&self) -> Result<Vec<String>> {
        self.set_state(WorkerState::Activating).await;

        let names = &self.names;
        let retired = self.storage.delete_where(|name| names.is_stale(name)).await;
        for name in &retired {
            info!(namespace = %name, "Retired stale namespace");
        }

        self.set_state(WorkerState::Activated).await;
        info!(
            generation = self.names.generation(),
            retired = retired.len(),
            "Activated"
        );
        Ok(retired)
    }

    // == Fetch ==
    /// Steady-state hook: classify, then resolve.
    pub async fn fetch(&self, request: &InterceptedRequest) -> ResponseSnapshot {
        match self.classifier.classify(request) {
            Route::Passthrough => self.engine.passthrough(request).await,
            Route::Intercept(class) => {
                let namespace = self.names.name(class.namespace());
                debug!(
                    method = %request.method,
                    url = %request.url,
                    class = ?class,
                    namespace = %namespace,
                    "Intercepted"
                );
                self.engine.resolve(request, class, &namespace).await
            }
        }
    }

    // == Message ==
    pub async fn handle_message(&self, message: ControlMessage) -> MessageOutcome {
        match message {
            ControlMessage::SkipWaiting => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                MessageOutcome::SkipWaitingRequested
            }
            ControlMessage::ClearCache => {
                let names = &self.names;
                let cleared = self.storage.delete_where(|name| names.is_owned(name)).await;
                info!(
                    prefix = self.names.prefix(),
                    deleted = cleared.len(),
                    "Cleared all caches"
                );
                MessageOutcome::Cleared(cleared)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::mock::ScriptedFetcher;
    use axum::http::StatusCode;

    fn config(generation: &str) -> Config {
        Config {
            cache_generation: generation.to_string(),
            precache_manifest: vec!["/".to_string(), "/static/js/app.js".to_string()],
            fetch_timeout: Duration::from_millis(200),
            ..Config::default()
        }
    }

    async fn online_fetcher() -> Arc<ScriptedFetcher> {
        let fetcher = ScriptedFetcher::online();
        fetcher.respond("/", StatusCode::OK, "<html>home</html>").await;
        fetcher.respond("/static/js/app.js", StatusCode::OK, "app()").await;
        fetcher
            .respond("/offline.html", StatusCode::OK, "<html>offline</html>")
            .await;
        Arc::new(fetcher)
    }

    fn worker(config: &Config, storage: &Arc<CacheStorage>, fetcher: &Arc<ScriptedFetcher>) -> Worker {
        Worker::new(
            config,
            storage.clone(),
            fetcher.clone(),
            Arc::new(CacheStats::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_install_precaches_manifest() {
        let storage = Arc::new(CacheStorage::new(100));
        let fetcher = online_fetcher().await;
        let worker = worker(&config("v1"), &storage, &fetcher);

        let count = worker.install().await.unwrap();

        assert_eq!(count, 3);
        assert_eq!(worker.state().await, WorkerState::Installed);
        assert!(worker.skip_waiting_requested());
        for name in worker.names().current() {
            assert!(storage.has(&name).await, "{} should exist", name);
        }
        let static_ns = storage.lookup("app-static-v1").await.unwrap();
        assert_eq!(static_ns.len().await, 3);
    }

    #[tokio::test]
    async fn test_install_fails_on_unreachable_entry() {
        let storage = Arc::new(CacheStorage::new(100));
        let fetcher = online_fetcher().await;
        let mut cfg = config("v2");
        cfg.precache_manifest.push("/missing.css".to_string());
        let worker = worker(&cfg, &storage, &fetcher);

        let result = worker.install().await;

        assert!(matches!(result, Err(CacheError::Install(_))));
        assert_eq!(worker.state().await, WorkerState::Redundant);
        let static_ns = storage.lookup("app-static-v2").await.unwrap();
        assert!(static_ns.is_empty().await);
    }

    #[tokio::test]
    async fn test_install_fails_when_offline() {
        let storage = Arc::new(CacheStorage::new(100));
        let fetcher = online_fetcher().await;
        fetcher.set_offline(true);
        let worker = worker(&config("v1"), &storage, &fetcher);

        assert!(worker.install().await.is_err());
        assert!(!worker.skip_waiting_requested());
    }

    #[tokio::test]
    async fn test_install_without_auto_skip_waits() {
        let storage = Arc::new(CacheStorage::new(100));
        let fetcher = online_fetcher().await;
        let cfg = Config {
            auto_skip_waiting: false,
            ..config("v1")
        };
        let worker = worker(&cfg, &storage, &fetcher);

        worker.install().await.unwrap();
        assert!(!worker.skip_waiting_requested());

        let outcome = worker.handle_message(ControlMessage::SkipWaiting).await;
        assert_eq!(outcome, MessageOutcome::SkipWaitingRequested);
        assert!(worker.skip_waiting_requested());
    }

    #[tokio::test]
    async fn test_activate_retires_only_stale_generations() {
        let storage = Arc::new(CacheStorage::new(100));
        let fetcher = online_fetcher().await;

        let v1 = worker(&config("v1"), &storage, &fetcher);
        v1.install().await.unwrap();
        v1.activate().await.unwrap();
        storage.open("unrelated-cache").await;

        let v2 = worker(&config("v2"), &storage, &fetcher);
        v2.install().await.unwrap();
        let retired = v2.activate().await.unwrap();

        assert_eq!(
            retired,
            vec!["app-dynamic-v1", "app-image-v1", "app-static-v1"]
        );
        assert_eq!(
            storage.keys().await,
            vec![
                "app-dynamic-v2",
                "app-image-v2",
                "app-static-v2",
                "unrelated-cache"
            ]
        );
        assert_eq!(v2.state().await, WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_clear_cache_removes_current_generation() {
        let storage = Arc::new(CacheStorage::new(100));
        let fetcher = online_fetcher().await;
        let worker = worker(&config("v1"), &storage, &fetcher);
        worker.install().await.unwrap();
        worker.activate().await.unwrap();
        storage.open("app-static-v0").await;
        storage.open("other").await;

        let outcome = worker.handle_message(ControlMessage::ClearCache).await;

        match outcome {
            MessageOutcome::Cleared(names) => assert_eq!(names.len(), 4),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(storage.keys().await, vec!["other"]);
    }

    #[tokio::test]
    async fn test_dispatch_fetch_serves_precached_asset_offline() {
        let storage = Arc::new(CacheStorage::new(100));
        let fetcher = online_fetcher().await;
        let worker = worker(&config("v1"), &storage, &fetcher);
        worker.dispatch(WorkerEvent::Install).await.unwrap();
        worker.dispatch(WorkerEvent::Activate).await.unwrap();
        fetcher.set_offline(true);

        let request = InterceptedRequest::get(
            Url::parse("http://127.0.0.1:8080/static/js/app.js").unwrap(),
        );
        let outcome = worker.dispatch(WorkerEvent::Fetch(request)).await.unwrap();

        match outcome {
            WorkerOutcome::Response(response) => {
                assert_eq!(response.status, StatusCode::OK);
                assert_eq!(&response.body[..], b"app()");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_event_kinds() {
        assert_eq!(WorkerEvent::Install.kind(), EventKind::Install);
        assert_eq!(
            WorkerEvent::Message(ControlMessage::ClearCache).kind(),
            EventKind::Message
        );
    }
}
