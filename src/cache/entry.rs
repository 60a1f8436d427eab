//! Cache Entry Module
//!
//! Response snapshots, request identities and the entries stored in namespaces.

use std::fmt;

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use url::Url;

// == Request Key ==
/// Identity of a stored response: method plus absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey(String);

impl RequestKey {
    pub fn new(method: &Method, url: &Url) -> Self {
        Self(format!("{} {}", method, url))
    }

    /// Key for a GET of `url`, the only method that is ever stored.
    pub fn get(url: &Url) -> Self {
        Self::new(&Method::GET, url)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Response Snapshot ==
/// A fully buffered HTTP response.
///
/// The body is reference counted, so cloning yields an independent readable
/// copy. Strategies clone before storing; the stored copy and the returned
/// one never share a consumable stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSnapshot {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ResponseSnapshot {
    // == Constructor ==
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Builds a response with a single content type header.
    pub fn with_content_type(
        status: StatusCode,
        content_type: &'static str,
        body: impl Into<Bytes>,
    ) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self::new(status, headers, body)
    }

    /// Only an exact 200 is ever written to a namespace.
    pub fn is_cacheable(&self) -> bool {
        self.status == StatusCode::OK
    }

    /// Returns a copy tagged with an extra header.
    pub fn tagged(mut self, name: HeaderName, value: &'static str) -> Self {
        self.headers.insert(name, HeaderValue::from_static(value));
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

impl IntoResponse for ResponseSnapshot {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

// == Cache Entry ==
/// A response stored in a namespace together with when it was captured.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub response: ResponseSnapshot,
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(response: ResponseSnapshot) -> Self {
        Self {
            response,
            cached_at: Utc::now(),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_key_format() {
        let url = Url::parse("http://localhost:8080/api/v1/cigars?page=2").unwrap();
        let key = RequestKey::get(&url);
        assert_eq!(key.as_str(), "GET http://localhost:8080/api/v1/cigars?page=2");
        assert_eq!(key.to_string(), key.as_str());
    }

    #[test]
    fn test_request_key_distinguishes_query() {
        let a = Url::parse("http://localhost/api/items?page=1").unwrap();
        let b = Url::parse("http://localhost/api/items?page=2").unwrap();
        assert_ne!(RequestKey::get(&a), RequestKey::get(&b));
    }

    #[test]
    fn test_only_ok_is_cacheable() {
        let ok = ResponseSnapshot::new(StatusCode::OK, HeaderMap::new(), "x");
        let created = ResponseSnapshot::new(StatusCode::CREATED, HeaderMap::new(), "x");
        let missing = ResponseSnapshot::new(StatusCode::NOT_FOUND, HeaderMap::new(), "x");

        assert!(ok.is_cacheable());
        assert!(!created.is_cacheable());
        assert!(!missing.is_cacheable());
    }

    #[test]
    fn test_clone_is_independent_copy() {
        let original = ResponseSnapshot::with_content_type(StatusCode::OK, "text/plain", "body");
        let copy = original.clone().tagged(
            HeaderName::from_static("x-offline-source"),
            "cache",
        );

        assert_eq!(copy.body, original.body);
        assert!(original.headers.get("x-offline-source").is_none());
        assert_eq!(copy.headers.get("x-offline-source").unwrap(), "cache");
    }

    #[tokio::test]
    async fn test_into_response_preserves_parts() {
        let snapshot =
            ResponseSnapshot::with_content_type(StatusCode::ACCEPTED, "application/json", "{}");
        let response = snapshot.into_response();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"{}");
    }
}
