//! Upstream Fetcher
//!
//! The outbound side of the proxy: sends an intercepted request to the real
//! network and buffers the answer into a [`ResponseSnapshot`].

use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderMap;
use tracing::debug;

use crate::cache::ResponseSnapshot;
use crate::error::{CacheError, Result};
use crate::intercept::InterceptedRequest;

/// Headers that describe a single connection and are never forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "host",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

// == Fetcher Trait ==
/// Issues a request to the network.
///
/// Any returned response, whatever its status, is a success. An `Err` means
/// the network itself failed.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<ResponseSnapshot>;
}

/// Races `fetcher` against `limit`; losing the race is a network failure.
pub async fn fetch_with_timeout(
    fetcher: &dyn Fetcher,
    request: &InterceptedRequest,
    limit: Duration,
) -> Result<ResponseSnapshot> {
    match tokio::time::timeout(limit, fetcher.fetch(request)).await {
        Ok(result) => result,
        Err(_) => {
            debug!(url = %request.url, timeout_ms = limit.as_millis() as u64, "Fetch timed out");
            Err(CacheError::Timeout(limit))
        }
    }
}

// == HTTP Fetcher ==
/// [`Fetcher`] backed by a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("offline_cache/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CacheError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<ResponseSnapshot> {
        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(end_to_end(&request.headers))
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| CacheError::Network(format!("{}: {}", request.url, e)))?;

        let status = response.status();
        let headers = end_to_end(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| CacheError::Network(format!("{}: {}", request.url, e)))?;

        debug!(url = %request.url, status = status.as_u16(), bytes = body.len(), "Fetched");
        Ok(ResponseSnapshot::new(status, headers, body))
    }
}

/// Copies `headers` without the hop-by-hop set.
fn end_to_end(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();
    for name in HOP_BY_HOP {
        forwarded.remove(*name);
    }
    forwarded
}
