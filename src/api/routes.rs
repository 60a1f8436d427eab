//! API Routes
//!
//! Configures the Axum router: the proxy's own endpoints under `/__offline`
//! and the interception fallback for everything else.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    health_handler, intercept_handler, message_handler, stats_handler, status_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /__offline/message` - Deliver a control message
/// - `GET /__offline/status` - Worker and namespace overview
/// - `GET /__offline/stats` - Resolution counters
/// - `GET /__offline/health` - Health check endpoint
/// - anything else - intercepted and resolved against the upstream
///
/// # Middleware
/// - CORS: only on the `/__offline` endpoints; intercepted traffic keeps
///   the upstream's own headers
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let control = Router::new()
        .route("/__offline/message", post(message_handler))
        .route("/__offline/status", get(status_handler))
        .route("/__offline/stats", get(stats_handler))
        .route("/__offline/health", get(health_handler))
        .layer(cors);

    Router::new()
        .merge(control)
        .fallback(intercept_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
