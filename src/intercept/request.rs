//! Intercepted request model.

use axum::http::{request::Parts, HeaderMap, Method};
use bytes::Bytes;
use url::Url;

use crate::cache::RequestKey;
use crate::error::{CacheError, Result};

/// Header browsers use to declare what a request will be used for.
pub const FETCH_DEST_HEADER: &str = "sec-fetch-dest";

// == Destination ==
/// Declared destination of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Font,
    /// No destination declared (plain fetch/XHR)
    Empty,
    Other,
}

impl Destination {
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("empty") => Destination::Empty,
            Some("document") => Destination::Document,
            Some("image") => Destination::Image,
            Some("script") => Destination::Script,
            Some("style") => Destination::Style,
            Some("font") => Destination::Font,
            Some(_) => Destination::Other,
        }
    }
}

// == Intercepted Request ==
/// An outgoing request as seen by the interceptor.
///
/// Only method, URL and destination drive caching decisions; headers and
/// body are forwarded untouched.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    pub method: Method,
    pub url: Url,
    pub destination: Destination,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl InterceptedRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            destination: Destination::Empty,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// A GET for `url` with no declared destination.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.destination =
            Destination::from_header(headers.get(FETCH_DEST_HEADER).and_then(|v| v.to_str().ok()));
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    /// Builds a request from inbound HTTP parts.
    ///
    /// Only the target's path and query are kept and resolved against
    /// `origin`; an absolute-form target naming another host still reaches
    /// the upstream. Targets that would resolve off-origin are rejected.
    pub fn from_parts(parts: &Parts, body: Bytes, origin: &Url) -> Result<Self> {
        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = origin
            .join(target)
            .map_err(|e| CacheError::InvalidRequest(format!("{}: {}", parts.uri, e)))?;
        if url.origin() != origin.origin() {
            return Err(CacheError::InvalidRequest(format!(
                "{} leaves the upstream origin",
                parts.uri
            )));
        }

        Ok(Self::new(parts.method.clone(), url)
            .with_headers(parts.headers.clone())
            .with_body(body))
    }

    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }

    pub fn is_navigation(&self) -> bool {
        self.destination == Destination::Document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn test_destination_from_header() {
        assert_eq!(Destination::from_header(None), Destination::Empty);
        assert_eq!(Destination::from_header(Some("")), Destination::Empty);
        assert_eq!(Destination::from_header(Some("document")), Destination::Document);
        assert_eq!(Destination::from_header(Some("Image")), Destination::Image);
        assert_eq!(Destination::from_header(Some("style")), Destination::Style);
        assert_eq!(Destination::from_header(Some("audio")), Destination::Other);
    }

    #[test]
    fn test_from_parts_resolves_against_origin() {
        let origin = Url::parse("http://upstream:8080/").unwrap();
        let (parts, _) = Request::builder()
            .uri("/api/v1/cigars?page=2")
            .header(FETCH_DEST_HEADER, "empty")
            .body(())
            .unwrap()
            .into_parts();

        let request = InterceptedRequest::from_parts(&parts, Bytes::new(), &origin).unwrap();
        assert_eq!(
            request.url.as_str(),
            "http://upstream:8080/api/v1/cigars?page=2"
        );
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.destination, Destination::Empty);
    }

    #[test]
    fn test_from_parts_pins_absolute_target_to_origin() {
        let origin = Url::parse("http://upstream:8080/").unwrap();
        let (parts, _) = Request::builder()
            .method("POST")
            .uri("http://169.254.169.254/latest/meta-data?x=1")
            .header(FETCH_DEST_HEADER, "document")
            .body(())
            .unwrap()
            .into_parts();

        let request =
            InterceptedRequest::from_parts(&parts, Bytes::from_static(b"a=1"), &origin).unwrap();
        assert_eq!(
            request.url.as_str(),
            "http://upstream:8080/latest/meta-data?x=1"
        );
        assert_eq!(request.method, Method::POST);
        assert!(request.is_navigation());
        assert_eq!(&request.body[..], b"a=1");
    }

    #[test]
    fn test_from_parts_rejects_scheme_relative_path() {
        let origin = Url::parse("http://upstream:8080/").unwrap();
        let (parts, _) = Request::builder()
            .uri("//elsewhere/login")
            .body(())
            .unwrap()
            .into_parts();

        let result = InterceptedRequest::from_parts(&parts, Bytes::new(), &origin);
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }
}
