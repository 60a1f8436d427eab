//! Background Tasks Module
//!
//! Contains background tasks that run alongside the proxy.
//!
//! # Tasks
//! - Rollout: installs and activates the configured cache generation

mod rollout;

pub use rollout::spawn_rollout_task;
