//! Axum middleware applying host-based rewrites
//!
//! Must wrap the whole `Router` (not be added with `Router::layer`) so the
//! URI is rewritten before route matching.

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Request, State},
    http::{HeaderMap, HeaderValue, Uri},
    middleware::Next,
    response::Response,
};

use super::host_resolver::{is_bypassed, HostRouter};
use crate::security::apply_status_page_headers;

/// Header set by reverse proxies carrying the client-facing host
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Middleware that rewrites status-page requests to their internal routes
pub async fn host_routing_middleware(
    State(router): State<Arc<HostRouter>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if is_bypassed(&path) {
        return next.run(request).await;
    }

    let Some(host) = request_host(request.headers(), request.uri()) else {
        return next.run(request).await;
    };

    let decision = router.route(&host, &path);
    let Some(target) = decision.rewrite_to else {
        return next.run(request).await;
    };

    let rewritten = match rewrite_uri(request.uri(), &target) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(host = %host, path = %path, error = %e, "Failed to build rewritten URI");
            return next.run(request).await;
        }
    };

    tracing::debug!(
        host = %host,
        from = %path,
        to = %target,
        classification = ?decision.classification,
        "Host rewrite"
    );

    let original = request.uri().clone();
    request.extensions_mut().insert(OriginalUri(original));
    *request.uri_mut() = rewritten;

    let mut response = next.run(request).await;
    apply_status_page_headers(response.headers_mut());
    response
}

/// Client-facing host: first `X-Forwarded-Host` entry, then `Host`,
/// then the URI authority
pub fn request_host(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    first_host(headers.get(X_FORWARDED_HOST))
        .or_else(|| first_host(headers.get(axum::http::header::HOST)))
        .or_else(|| uri.authority().map(|a| a.as_str().to_string()))
}

/// First non-empty comma-separated entry of a host header
fn first_host(value: Option<&HeaderValue>) -> Option<String> {
    value
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Replace the path of a URI, keeping its query string
fn rewrite_uri(uri: &Uri, path: &str) -> Result<Uri, axum::http::Error> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse()?);
    Ok(Uri::from_parts(parts)?)
}
