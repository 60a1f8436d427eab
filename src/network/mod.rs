//! Network Module
//!
//! Outbound fetching with a bounded timeout.

mod fetcher;

#[cfg(test)]
pub(crate) mod mock;

pub use fetcher::{fetch_with_timeout, Fetcher, HttpFetcher};
