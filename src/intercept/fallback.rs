//! Synthesized responses used when both cache and network come up empty.

use axum::http::{HeaderName, StatusCode};

use crate::cache::ResponseSnapshot;

/// Names which fallback produced a response.
pub const FALLBACK_HEADER: HeaderName = HeaderName::from_static("x-offline-fallback");
/// Whether a response came from `cache` or `network`.
pub const SOURCE_HEADER: HeaderName = HeaderName::from_static("x-offline-source");

const PLACEHOLDER_SVG: &str = concat!(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="200" viewBox="0 0 200 200">"##,
    r##"<rect width="200" height="200" fill="#e0e0e0"/>"##,
    r##"<text x="50%" y="50%" text-anchor="middle" dominant-baseline="middle" "##,
    r##"font-family="sans-serif" font-size="14" fill="#757575">Image unavailable</text>"##,
    "</svg>"
);

/// Network-First with nothing cached and nothing offline to show.
pub fn network_error() -> ResponseSnapshot {
    ResponseSnapshot::with_content_type(
        StatusCode::REQUEST_TIMEOUT,
        "text/plain; charset=utf-8",
        "Network error: the request could not be completed while offline",
    )
    .tagged(FALLBACK_HEADER, "network-error")
}

/// Cache-First miss for an image.
pub fn placeholder_image() -> ResponseSnapshot {
    ResponseSnapshot::with_content_type(StatusCode::OK, "image/svg+xml", PLACEHOLDER_SVG)
        .tagged(FALLBACK_HEADER, "placeholder-image")
}

/// Cache-First miss for anything that is not an image.
pub fn unavailable() -> ResponseSnapshot {
    ResponseSnapshot::with_content_type(
        StatusCode::SERVICE_UNAVAILABLE,
        "text/plain; charset=utf-8",
        "Service unavailable: resource is not cached and the network is unreachable",
    )
    .tagged(FALLBACK_HEADER, "unavailable")
}

/// Upstream unreachable for a request that is never cached.
pub fn bad_gateway() -> ResponseSnapshot {
    ResponseSnapshot::with_content_type(
        StatusCode::BAD_GATEWAY,
        "text/plain; charset=utf-8",
        "Bad gateway: upstream is unreachable",
    )
    .tagged(FALLBACK_HEADER, "bad-gateway")
}

/// Marks the stored offline document when it stands in for a navigation.
pub fn offline_page(page: ResponseSnapshot) -> ResponseSnapshot {
    page.tagged(FALLBACK_HEADER, "offline-page")
}
