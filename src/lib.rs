//! Offline Cache - an offline-resilience caching proxy
//!
//! Intercepts an application's HTTP traffic, serves it Network-First or
//! Cache-First depending on the resource class, and manages versioned
//! cache generations with install/activate rollover.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod intercept;
pub mod models;
pub mod network;
pub mod tasks;
pub mod worker;

pub use api::AppState;
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_rollout_task;
pub use worker::{ControlMessage, Registration};
