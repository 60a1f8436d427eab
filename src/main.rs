//! Offline Cache - an offline-resilience caching proxy
//!
//! Intercepts an application's HTTP traffic and keeps it usable while the
//! upstream is unreachable.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use offline_cache::{
    api::create_router, cache::CacheStorage, network::HttpFetcher, spawn_rollout_task, AppState,
    Config, Registration,
};

/// Main entry point for the offline cache proxy.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create namespace storage, upstream client and registration
/// 4. Start the generation rollout task
/// 5. Create Axum router with the interception fallback
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "offline_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting offline cache proxy");

    let config = Config::from_env();
    info!(
        upstream = %config.upstream_url,
        prefix = %config.cache_prefix,
        generation = %config.cache_generation,
        port = config.server_port,
        fetch_timeout_ms = config.fetch_timeout.as_millis() as u64,
        manifest_entries = config.manifest().len(),
        "Configuration loaded"
    );

    let storage = Arc::new(CacheStorage::new(config.max_entries_per_namespace));
    let fetcher = Arc::new(HttpFetcher::new()?);
    let registration = Arc::new(Registration::new(storage, fetcher, config.fetch_timeout));

    // Install and activate in the background so the listener is up at once
    let rollout_handle = spawn_rollout_task(registration.clone(), config.clone());
    info!("Generation rollout task started");

    let app = create_router(AppState::new(registration, &config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Proxy listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(rollout_handle))
        .await
        .context("server error")?;

    info!("Proxy shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the rollout task and allows graceful shutdown.
async fn shutdown_signal(rollout_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if !rollout_handle.is_finished() {
        rollout_handle.abort();
        warn!("Rollout task aborted");
    }
}
