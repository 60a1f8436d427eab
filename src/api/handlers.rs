//! API Handlers
//!
//! The interception fallback plus the proxy's own `/__offline/*` endpoints.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{rejection::JsonRejection, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use url::Url;

use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::intercept::InterceptedRequest;
use crate::models::{
    AcceptedResponse, HealthResponse, NamespaceSummary, StatsResponse, StatusResponse,
};
use crate::worker::{ControlMessage, Registration};

/// Largest request body buffered for forwarding.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub registration: Arc<Registration>,
    /// Origin inbound requests are resolved against
    pub origin: Url,
    /// Prefix reported while no worker is active
    pub prefix: String,
}

impl AppState {
    /// Creates a new AppState around an existing registration.
    pub fn new(registration: Arc<Registration>, config: &Config) -> Self {
        Self {
            registration,
            origin: config.upstream_url.clone(),
            prefix: config.cache_prefix.clone(),
        }
    }
}

/// Fallback handler: every request not addressed to the proxy itself.
pub async fn intercept_handler(State(state): State<AppState>, request: Request) -> Response {
    match to_intercepted(&state, request).await {
        Ok(intercepted) => state.registration.fetch(intercepted).await.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn to_intercepted(state: &AppState, request: Request) -> Result<InterceptedRequest> {
    let (parts, body): (_, Body) = request.into_parts();
    let body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| CacheError::InvalidRequest(format!("unreadable body: {}", e)))?;
    InterceptedRequest::from_parts(&parts, body, &state.origin)
}

/// Handler for POST /__offline/message
///
/// Fire-and-forget: the caller only learns that the message was accepted.
pub async fn message_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ControlMessage>, JsonRejection>,
) -> Result<(StatusCode, Json<AcceptedResponse>)> {
    let Json(message) =
        payload.map_err(|e| CacheError::InvalidRequest(e.body_text()))?;

    state.registration.post_message(message).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse::new(message.as_str())),
    ))
}

/// Handler for GET /__offline/status
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let registration = &state.registration;
    let active = registration.active().await;
    let waiting = registration.waiting().await;

    let mut namespaces = Vec::new();
    for name in registration.storage().keys().await {
        if let Ok(namespace) = registration.storage().lookup(&name).await {
            namespaces.push(NamespaceSummary {
                entries: namespace.len().await,
                name,
            });
        }
    }

    let active_state = match &active {
        Some(worker) => Some(worker.state().await),
        None => None,
    };

    Json(StatusResponse {
        prefix: active
            .as_ref()
            .map(|w| w.names().prefix().to_string())
            .unwrap_or_else(|| state.prefix.clone()),
        active_generation: active.as_ref().map(|w| w.names().generation().to_string()),
        active_state,
        waiting_generation: waiting.as_ref().map(|w| w.names().generation().to_string()),
        namespaces,
    })
}

/// Handler for GET /__offline/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(state.registration.stats().snapshot()))
}

/// Handler for GET /__offline/health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
