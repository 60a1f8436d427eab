//! Cache Store Module
//!
//! Named namespaces of stored responses and the storage that owns them.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{CacheEntry, RequestKey, ResponseSnapshot};
use crate::error::{CacheError, Result};

// == Namespace ==
/// A named key→response partition.
///
/// Entries are replaced wholesale per key and never deleted one by one.
#[derive(Debug)]
pub struct Namespace {
    name: String,
    entries: RwLock<HashMap<RequestKey, CacheEntry>>,
    /// Maximum number of distinct keys
    max_entries: usize,
}

impl Namespace {
    // == Constructor ==
    fn new(name: impl Into<String>, max_entries: usize) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(HashMap::new()),
            max_entries,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // == Get ==
    /// Returns a copy of the stored response for `key`.
    pub async fn get(&self, key: &RequestKey) -> Option<ResponseSnapshot> {
        let entries = self.entries.read().await;
        entries.get(key).map(|entry| entry.response.clone())
    }

    /// Returns the full entry, including when it was captured.
    pub async fn entry(&self, key: &RequestKey) -> Option<CacheEntry> {
        self.entries.read().await.get(key).cloned()
    }

    // == Put ==
    /// Stores a response, overwriting any previous entry for the same key.
    ///
    /// A new key is refused once the namespace holds `max_entries` keys.
    pub async fn put(&self, key: RequestKey, response: ResponseSnapshot) -> Result<()> {
        let mut entries = self.entries.write().await;

        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            return Err(CacheError::QuotaExceeded(format!(
                "{} holds the maximum of {} entries",
                self.name, self.max_entries
            )));
        }

        debug!(namespace = %self.name, key = %key, "Stored entry");
        entries.insert(key, CacheEntry::new(response));
        Ok(())
    }

    // == Clear ==
    /// Drops every entry while keeping the namespace itself.
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        count
    }

    pub async fn keys(&self) -> Vec<RequestKey> {
        let mut keys: Vec<RequestKey> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

// == Cache Storage ==
/// Every namespace, across all generations, keyed by name.
#[derive(Debug)]
pub struct CacheStorage {
    namespaces: RwLock<BTreeMap<String, Arc<Namespace>>>,
    /// Quota applied to each namespace on creation
    max_entries_per_namespace: usize,
}

impl CacheStorage {
    // == Constructor ==
    pub fn new(max_entries_per_namespace: usize) -> Self {
        Self {
            namespaces: RwLock::new(BTreeMap::new()),
            max_entries_per_namespace,
        }
    }

    // == Open ==
    /// Returns the named namespace, creating it when absent.
    pub async fn open(&self, name: &str) -> Arc<Namespace> {
        if let Some(namespace) = self.namespaces.read().await.get(name) {
            return namespace.clone();
        }

        let mut namespaces = self.namespaces.write().await;
        namespaces
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(namespace = name, "Opened namespace");
                Arc::new(Namespace::new(name, self.max_entries_per_namespace))
            })
            .clone()
    }

    /// Returns the named namespace without creating it.
    pub async fn lookup(&self, name: &str) -> Result<Arc<Namespace>> {
        self.namespaces
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| CacheError::NamespaceNotFound(name.to_string()))
    }

    pub async fn has(&self, name: &str) -> bool {
        self.namespaces.read().await.contains_key(name)
    }

    // == Keys ==
    /// Lists namespace names in sorted order.
    pub async fn keys(&self) -> Vec<String> {
        self.namespaces.read().await.keys().cloned().collect()
    }

    // == Delete ==
    /// Removes a whole namespace. Returns false when it did not exist.
    pub async fn delete(&self, name: &str) -> bool {
        self.namespaces.write().await.remove(name).is_some()
    }

    /// Removes every namespace whose name satisfies `predicate`.
    pub async fn delete_where<F>(&self, predicate: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        let mut namespaces = self.namespaces.write().await;
        let doomed: Vec<String> = namespaces
            .keys()
            .filter(|name| predicate(name))
            .cloned()
            .collect();

        for name in &doomed {
            namespaces.remove(name);
        }
        doomed
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use url::Url;

    fn key(path: &str) -> RequestKey {
        RequestKey::get(&Url::parse("http://localhost").unwrap().join(path).unwrap())
    }

    fn ok(body: &'static str) -> ResponseSnapshot {
        ResponseSnapshot::new(StatusCode::OK, HeaderMap::new(), body)
    }

    #[tokio::test]
    async fn test_open_creates_once() {
        let storage = CacheStorage::new(10);

        let first = storage.open("app-static-v1").await;
        first.put(key("/a"), ok("a")).await.unwrap();

        let second = storage.open("app-static-v1").await;
        assert_eq!(second.len().await, 1);
        assert_eq!(storage.keys().await, vec!["app-static-v1"]);
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let storage = CacheStorage::new(10);
        let namespace = storage.open("app-dynamic-v1").await;

        namespace.put(key("/api/items"), ok("[1,2]")).await.unwrap();

        let stored = namespace.get(&key("/api/items")).await.unwrap();
        assert_eq!(&stored.body[..], b"[1,2]");
        assert!(namespace.get(&key("/api/other")).await.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let storage = CacheStorage::new(10);
        let namespace = storage.open("app-dynamic-v1").await;

        namespace.put(key("/api/items"), ok("old")).await.unwrap();
        namespace.put(key("/api/items"), ok("new")).await.unwrap();

        assert_eq!(namespace.len().await, 1);
        let stored = namespace.get(&key("/api/items")).await.unwrap();
        assert_eq!(&stored.body[..], b"new");
    }

    #[tokio::test]
    async fn test_quota_refuses_new_keys_only() {
        let storage = CacheStorage::new(2);
        let namespace = storage.open("app-image-v1").await;

        namespace.put(key("/a.png"), ok("a")).await.unwrap();
        namespace.put(key("/b.png"), ok("b")).await.unwrap();

        let result = namespace.put(key("/c.png"), ok("c")).await;
        assert!(matches!(result, Err(CacheError::QuotaExceeded(_))));

        // Overwriting an existing key is still allowed
        namespace.put(key("/a.png"), ok("a2")).await.unwrap();
        assert_eq!(namespace.len().await, 2);
    }

    #[tokio::test]
    async fn test_delete_namespace() {
        let storage = CacheStorage::new(10);
        storage.open("app-static-v1").await;

        assert!(storage.has("app-static-v1").await);
        assert!(storage.delete("app-static-v1").await);
        assert!(!storage.has("app-static-v1").await);
        assert!(!storage.delete("app-static-v1").await);
        assert!(matches!(
            storage.lookup("app-static-v1").await,
            Err(CacheError::NamespaceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_where() {
        let storage = CacheStorage::new(10);
        for name in ["app-static-v1", "app-image-v1", "other-cache"] {
            storage.open(name).await;
        }

        let removed = storage.delete_where(|name| name.starts_with("app-")).await;
        assert_eq!(removed, vec!["app-image-v1", "app-static-v1"]);
        assert_eq!(storage.keys().await, vec!["other-cache"]);
    }

    #[tokio::test]
    async fn test_clear_keeps_namespace() {
        let storage = CacheStorage::new(10);
        let namespace = storage.open("app-dynamic-v1").await;
        namespace.put(key("/x"), ok("x")).await.unwrap();

        assert_eq!(namespace.clear().await, 1);
        assert!(namespace.is_empty().await);
        assert!(storage.has("app-dynamic-v1").await);
    }

    #[tokio::test]
    async fn test_entry_records_capture_time() {
        let storage = CacheStorage::new(10);
        let namespace = storage.open("app-dynamic-v1").await;
        let before = chrono::Utc::now();

        namespace.put(key("/x"), ok("x")).await.unwrap();

        let entry = namespace.entry(&key("/x")).await.unwrap();
        assert!(entry.cached_at >= before);
        assert_eq!(namespace.keys().await, vec![key("/x")]);
    }
}
