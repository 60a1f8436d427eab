//! Generation Rollout Task
//!
//! Background task that installs and activates the configured generation,
//! retrying while the upstream cannot serve the precache manifest.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::worker::Registration;

/// Spawns a background task that registers the configured generation.
///
/// Until it succeeds, traffic passes straight to the network (or keeps
/// being served by an already active generation). A failed install is
/// retried every `install_retry_interval` seconds; an interval of zero
/// gives up after the first failure.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_rollout_task(registration.clone(), config.clone());
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_rollout_task(registration: Arc<Registration>, config: Config) -> JoinHandle<()> {
    let retry = Duration::from_secs(config.install_retry_interval);

    tokio::spawn(async move {
        info!(
            generation = %config.cache_generation,
            prefix = %config.cache_prefix,
            "Starting generation rollout"
        );

        let mut attempt: u32 = 1;
        loop {
            match registration.register(&config).await {
                Ok(state) => {
                    info!(attempt, state = ?state, "Generation rollout finished");
                    return;
                }
                Err(err) if retry.is_zero() => {
                    warn!(attempt, error = %err, "Generation rollout failed, not retrying");
                    return;
                }
                Err(err) => {
                    warn!(
                        attempt,
                        error = %err,
                        retry_in_secs = retry.as_secs(),
                        "Generation rollout failed"
                    );
                }
            }

            tokio::time::sleep(retry).await;
            attempt += 1;
        }
    })
}
