//! Response models for the proxy's own endpoints
//!
//! DTOs serialized by the `/__offline/*` handlers.

pub mod responses;

// Re-export commonly used types
pub use responses::{
    AcceptedResponse, ErrorResponse, HealthResponse, NamespaceSummary, StatsResponse,
    StatusResponse,
};
