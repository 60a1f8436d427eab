//! Request Classifier
//!
//! Assigns each request a resource class, which in turn selects the strategy
//! and namespace that handle it.

use axum::http::Method;

use super::request::{Destination, InterceptedRequest};
use crate::cache::NamespaceKind;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "svg", "webp", "ico"];
const STATIC_EXTENSIONS: &[&str] = &["css", "js", "woff", "woff2", "ttf", "eot"];

// == Resource Class ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceClass {
    Api,
    Image,
    StaticAsset,
    Document,
    Default,
}

/// Fetch-resolution algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    NetworkFirst,
    CacheFirst,
}

impl ResourceClass {
    pub fn strategy(self) -> Strategy {
        match self {
            ResourceClass::Api | ResourceClass::Document | ResourceClass::Default => {
                Strategy::NetworkFirst
            }
            ResourceClass::Image | ResourceClass::StaticAsset => Strategy::CacheFirst,
        }
    }

    pub fn namespace(self) -> NamespaceKind {
        match self {
            ResourceClass::Image => NamespaceKind::Image,
            ResourceClass::StaticAsset => NamespaceKind::Static,
            ResourceClass::Api | ResourceClass::Document | ResourceClass::Default => {
                NamespaceKind::Dynamic
            }
        }
    }
}

// == Route ==
/// Outcome of classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Forwarded to the network with no caching at all
    Passthrough,
    Intercept(ResourceClass),
}

// == Classifier ==
#[derive(Debug, Clone)]
pub struct Classifier {
    api_prefix: String,
}

impl Classifier {
    pub fn new(api_prefix: impl Into<String>) -> Self {
        Self {
            api_prefix: api_prefix.into(),
        }
    }

    /// Classifies a request. First matching rule wins.
    pub fn classify(&self, request: &InterceptedRequest) -> Route {
        if request.method != Method::GET || !matches!(request.url.scheme(), "http" | "https") {
            return Route::Passthrough;
        }

        let path = request.url.path();
        let lowered = extension(path);
        let extension = lowered.as_deref();

        let class = if path.starts_with(&self.api_prefix) {
            ResourceClass::Api
        } else if request.destination == Destination::Image || in_set(extension, IMAGE_EXTENSIONS) {
            ResourceClass::Image
        } else if in_set(extension, STATIC_EXTENSIONS) {
            ResourceClass::StaticAsset
        } else if request.destination == Destination::Document
            || extension == Some("html")
            || path == "/"
        {
            ResourceClass::Document
        } else {
            ResourceClass::Default
        };

        Route::Intercept(class)
    }
}

fn in_set(extension: Option<&str>, set: &[&str]) -> bool {
    extension.map(|ext| set.contains(&ext)).unwrap_or(false)
}

/// Lowercased extension of the last path segment.
fn extension(path: &str) -> Option<String> {
    let segment = path.rsplit('/').next().unwrap_or(path);
    match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext.to_ascii_lowercase()),
        _ => None,
    }
}
