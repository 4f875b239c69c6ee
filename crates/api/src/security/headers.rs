//! Security headers for rewritten status-page responses
//!
//! Status pages are served on tenant-controlled hostnames, so every response
//! produced through a host rewrite is hardened before it leaves the server.

use axum::http::{header, HeaderMap, HeaderValue};

/// Add the fixed status-page security headers
pub fn apply_status_page_headers(headers: &mut HeaderMap) {
    // Prevent MIME type sniffing
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );

    // Prevent clickjacking
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));

    // Tenant pages must never be served from a shared cache
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );

    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
}
