//! Response DTOs for the proxy's own endpoints
//!
//! Defines the structure of outgoing `/__offline/*` response bodies.

use serde::Serialize;

use crate::cache::StatsSnapshot;
use crate::worker::WorkerState;

/// One namespace in the status report.
#[derive(Debug, Clone, Serialize)]
pub struct NamespaceSummary {
    pub name: String,
    pub entries: usize,
}

/// Response body for GET /__offline/status
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    /// Cache prefix this proxy owns
    pub prefix: String,
    /// Generation of the active worker, if any
    pub active_generation: Option<String>,
    pub active_state: Option<WorkerState>,
    /// Generation installed and waiting to activate
    pub waiting_generation: Option<String>,
    /// Every namespace in storage, prefixed or not
    pub namespaces: Vec<NamespaceSummary>,
}

/// Response body for GET /__offline/stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub counters: StatsSnapshot,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from a counter snapshot
    pub fn new(counters: StatsSnapshot) -> Self {
        let hit_rate = counters.hit_rate();
        Self { counters, hit_rate }
    }
}

/// Response body for POST /__offline/message
#[derive(Debug, Clone, Serialize)]
pub struct AcceptedResponse {
    pub message: String,
}

impl AcceptedResponse {
    pub fn new(kind: &str) -> Self {
        Self {
            message: format!("{} accepted", kind),
        }
    }
}

/// Response body for the health endpoint (GET /__offline/health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
