//! Scripted fetcher for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use tokio::sync::RwLock;

use super::Fetcher;
use crate::cache::ResponseSnapshot;
use crate::error::{CacheError, Result};
use crate::intercept::InterceptedRequest;

/// Serves canned responses by URL path and counts every call.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    responses: RwLock<HashMap<String, (StatusCode, Bytes)>>,
    offline: AtomicBool,
    hang: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn online() -> Self {
        Self::default()
    }

    pub fn hanging() -> Self {
        let fetcher = Self::default();
        fetcher.hang.store(true, Ordering::SeqCst);
        fetcher
    }

    pub async fn respond(&self, path: &str, status: StatusCode, body: &'static str) {
        self.responses
            .write()
            .await
            .insert(path.to_string(), (status, Bytes::from_static(body.as_bytes())));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<ResponseSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(CacheError::Network("connection refused".to_string()));
        }

        let responses = self.responses.read().await;
        let response = match responses.get(request.url.path()) {
            Some((status, body)) => ResponseSnapshot::new(*status, HeaderMap::new(), body.clone()),
            None => ResponseSnapshot::new(StatusCode::NOT_FOUND, HeaderMap::new(), "not found"),
        };
        Ok(response)
    }
}
