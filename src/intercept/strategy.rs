//! Strategy Engine
//!
//! Network-First and Cache-First resolution, each bound to a namespace at
//! call time. Failures are absorbed here and turned into best-effort
//! responses; callers always get a response back.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use super::classify::{ResourceClass, Strategy};
use super::fallback::{self, SOURCE_HEADER};
use super::request::InterceptedRequest;
use crate::cache::{CacheStats, CacheStorage, RequestKey, ResponseSnapshot};
use crate::network::{fetch_with_timeout, Fetcher};

// == Strategy Engine ==
#[derive(Clone)]
pub struct StrategyEngine {
    storage: Arc<CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    stats: Arc<CacheStats>,
    fetch_timeout: Duration,
    /// Namespace holding the offline document
    static_namespace: String,
    /// Key of the offline document inside `static_namespace`
    offline_page: RequestKey,
}

impl StrategyEngine {
    pub fn new(
        storage: Arc<CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        stats: Arc<CacheStats>,
        fetch_timeout: Duration,
        static_namespace: String,
        offline_page: RequestKey,
    ) -> Self {
        Self {
            storage,
            fetcher,
            stats,
            fetch_timeout,
            static_namespace,
            offline_page,
        }
    }

    /// Runs the strategy `class` selects against `namespace`.
    pub async fn resolve(
        &self,
        request: &InterceptedRequest,
        class: ResourceClass,
        namespace: &str,
    ) -> ResponseSnapshot {
        match class.strategy() {
            Strategy::NetworkFirst => self.network_first(request, namespace).await,
            Strategy::CacheFirst => self.cache_first(request, class, namespace).await,
        }
    }

    // == Network First ==
    /// Prefers a live response; falls back to the namespace, then to the
    /// offline document for navigations, then to a synthesized 408.
    pub async fn network_first(
        &self,
        request: &InterceptedRequest,
        namespace: &str,
    ) -> ResponseSnapshot {
        let key = request.key();

        match self.fetch(request).await {
            Some(response) => {
                if response.is_cacheable() {
                    self.store(namespace, key, response.clone()).await;
                }
                response.tagged(SOURCE_HEADER, "network")
            }
            None => {
                if let Some(cached) = self.lookup(namespace, &key).await {
                    debug!(namespace, key = %key, "Serving cached response while offline");
                    return cached;
                }

                self.stats.record_fallback();
                if request.is_navigation() {
                    if let Some(page) = self.stored_offline_page().await {
                        return fallback::offline_page(page);
                    }
                }
                fallback::network_error()
            }
        }
    }

    // == Cache First ==
    /// Serves a stored entry without touching the network; otherwise
    /// fetches and stores, then falls back to a placeholder or a 503.
    pub async fn cache_first(
        &self,
        request: &InterceptedRequest,
        class: ResourceClass,
        namespace: &str,
    ) -> ResponseSnapshot {
        let key = request.key();

        if let Some(cached) = self.lookup(namespace, &key).await {
            return cached;
        }

        match self.fetch(request).await {
            Some(response) => {
                if response.is_cacheable() {
                    self.store(namespace, key, response.clone()).await;
                }
                response.tagged(SOURCE_HEADER, "network")
            }
            None => {
                self.stats.record_fallback();
                if class == ResourceClass::Image {
                    fallback::placeholder_image()
                } else {
                    fallback::unavailable()
                }
            }
        }
    }

    /// Forwards a request that is not intercepted at all.
    pub async fn passthrough(&self, request: &InterceptedRequest) -> ResponseSnapshot {
        self.stats.record_passthrough();
        self.fetch(request)
            .await
            .unwrap_or_else(fallback::bad_gateway)
    }

    // == Helpers ==
    async fn fetch(&self, request: &InterceptedRequest) -> Option<ResponseSnapshot> {
        match fetch_with_timeout(self.fetcher.as_ref(), request, self.fetch_timeout).await {
            Ok(response) => {
                self.stats.record_network_response();
                Some(response)
            }
            Err(err) => {
                self.stats.record_network_failure();
                if err.is_network() {
                    debug!(url = %request.url, error = %err, "Network fetch failed");
                } else {
                    warn!(url = %request.url, error = %err, "Fetch could not be attempted");
                }
                None
            }
        }
    }

    /// Reads `key` from `namespace`, counting a hit or a miss. A namespace
    /// that no longer exists is a miss and is not recreated.
    async fn lookup(&self, namespace: &str, key: &RequestKey) -> Option<ResponseSnapshot> {
        let found = match self.storage.lookup(namespace).await {
            Ok(target) => target.entry(key).await,
            Err(_) => None,
        };
        match found {
            Some(entry) => {
                self.stats.record_hit();
                debug!(
                    namespace,
                    key = %key,
                    age_secs = (Utc::now() - entry.cached_at).num_seconds(),
                    "Cache hit"
                );
                Some(entry.response.tagged(SOURCE_HEADER, "cache"))
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// The precached offline document, read without touching the counters.
    async fn stored_offline_page(&self) -> Option<ResponseSnapshot> {
        let target = self.storage.lookup(&self.static_namespace).await.ok()?;
        target.get(&self.offline_page).await
    }

    /// Stores a copy; a refused write never blocks the response. Only
    /// install creates namespaces, so a wiped one stays gone.
    async fn store(&self, namespace: &str, key: RequestKey, response: ResponseSnapshot) {
        let result = match self.storage.lookup(namespace).await {
            Ok(target) => target.put(key, response).await,
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            self.stats.record_store_failure();
            warn!(namespace, error = %err, "Failed to store response, serving uncached");
        }
    }
}
