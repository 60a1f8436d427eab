//! Error types for the offline cache proxy
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the offline cache proxy.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Named namespace does not exist in storage
    #[error("Namespace not found: {0}")]
    NamespaceNotFound(String),

    /// Namespace refused a new entry
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Upstream could not be reached or the transfer broke off
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream did not answer within the fetch timeout
    #[error("Network timeout after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Precache manifest could not be fully fetched and stored
    #[error("Install failed: {0}")]
    Install(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// True for failures that strategies recover from via the cache.
    pub fn is_network(&self) -> bool {
        matches!(self, CacheError::Network(_) | CacheError::Timeout(_))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NamespaceNotFound(_) => StatusCode::NOT_FOUND,
            CacheError::QuotaExceeded(_) => StatusCode::INSUFFICIENT_STORAGE,
            CacheError::Network(_) => StatusCode::BAD_GATEWAY,
            CacheError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            CacheError::Install(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the offline cache proxy.
pub type Result<T> = std::result::Result<T, CacheError>;
