//! Configuration Module
//!
//! Handles loading and managing proxy configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

/// Critical-path assets stored in the static namespace at install time.
pub const DEFAULT_MANIFEST: &[&str] = &[
    "/",
    "/index.html",
    "/login.html",
    "/static/css/styles.css",
    "/static/js/app.js",
    "/static/logo.png",
    "/offline.html",
];

/// Proxy configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Origin every intercepted request is resolved against and forwarded to
    pub upstream_url: Url,
    /// Prefix shared by every namespace this proxy owns
    pub cache_prefix: String,
    /// Generation tag embedded in the current namespace names
    pub cache_generation: String,
    /// Path prefix that marks API calls
    pub api_prefix: String,
    /// Root-relative path of the offline fallback document
    pub offline_page: String,
    /// Root-relative paths fetched into the static namespace at install
    pub precache_manifest: Vec<String>,
    /// Upper bound on a single upstream fetch
    pub fetch_timeout: Duration,
    /// Activate a freshly installed generation without waiting for SKIP_WAITING
    pub auto_skip_waiting: bool,
    /// Distinct keys a namespace accepts before refusing new entries
    pub max_entries_per_namespace: usize,
    /// Seconds between install attempts after a failure, 0 disables retries
    pub install_retry_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `UPSTREAM_URL` - Origin server (default: http://127.0.0.1:8080/)
    /// - `CACHE_PREFIX` - Namespace prefix (default: app-)
    /// - `CACHE_GENERATION` - Generation tag (default: v1)
    /// - `API_PREFIX` - API route prefix (default: /api/)
    /// - `OFFLINE_PAGE` - Offline fallback document (default: /offline.html)
    /// - `PRECACHE_MANIFEST` - Comma-separated manifest paths
    /// - `FETCH_TIMEOUT_MS` - Upstream fetch timeout (default: 10000)
    /// - `AUTO_SKIP_WAITING` - Activate right after install (default: true)
    /// - `MAX_ENTRIES_PER_NAMESPACE` - Namespace quota (default: 10000)
    /// - `INSTALL_RETRY_INTERVAL` - Install retry delay in seconds (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let precache_manifest = env::var("PRECACHE_MANIFEST")
            .ok()
            .map(|v| parse_manifest(&v))
            .filter(|paths| !paths.is_empty())
            .unwrap_or(defaults.precache_manifest);

        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            upstream_url: env_or("UPSTREAM_URL", defaults.upstream_url),
            cache_prefix: env_or("CACHE_PREFIX", defaults.cache_prefix),
            cache_generation: env_or("CACHE_GENERATION", defaults.cache_generation),
            api_prefix: env_or("API_PREFIX", defaults.api_prefix),
            offline_page: env_or("OFFLINE_PAGE", defaults.offline_page),
            precache_manifest,
            fetch_timeout: Duration::from_millis(env_or(
                "FETCH_TIMEOUT_MS",
                defaults.fetch_timeout.as_millis() as u64,
            )),
            auto_skip_waiting: env_or("AUTO_SKIP_WAITING", defaults.auto_skip_waiting),
            max_entries_per_namespace: env_or(
                "MAX_ENTRIES_PER_NAMESPACE",
                defaults.max_entries_per_namespace,
            ),
            install_retry_interval: env_or(
                "INSTALL_RETRY_INTERVAL",
                defaults.install_retry_interval,
            ),
        }
    }

    /// Manifest paths with the offline page guaranteed to be present.
    pub fn manifest(&self) -> Vec<String> {
        let mut paths = self.precache_manifest.clone();
        if !paths.iter().any(|p| p == &self.offline_page) {
            paths.push(self.offline_page.clone());
        }
        paths
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            upstream_url: Url::parse("http://127.0.0.1:8080/").expect("static url"),
            cache_prefix: "app-".to_string(),
            cache_generation: "v1".to_string(),
            api_prefix: "/api/".to_string(),
            offline_page: "/offline.html".to_string(),
            precache_manifest: DEFAULT_MANIFEST.iter().map(|p| p.to_string()).collect(),
            fetch_timeout: Duration::from_millis(10_000),
            auto_skip_waiting: true,
            max_entries_per_namespace: 10_000,
            install_retry_interval: 30,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_manifest(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
