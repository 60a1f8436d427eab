//! API Module
//!
//! HTTP surface of the proxy.
//!
//! # Endpoints
//! - `POST /__offline/message` - Deliver a control message
//! - `GET /__offline/status` - Worker and namespace overview
//! - `GET /__offline/stats` - Resolution counters
//! - `GET /__offline/health` - Health check endpoint
//! - everything else - intercepted

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
