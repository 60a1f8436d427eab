//! Cache Module
//!
//! Versioned namespaces of stored HTTP responses.

mod entry;
mod names;
mod stats;
mod store;

// Re-export public types
pub use entry::{CacheEntry, RequestKey, ResponseSnapshot};
pub use names::{CacheNames, NamespaceKind};
pub use stats::{CacheStats, StatsSnapshot};
pub use store::{CacheStorage, Namespace};
