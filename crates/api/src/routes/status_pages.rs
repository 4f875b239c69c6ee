//! Internal status-page routes reached through host rewrites

use axum::{extract::Path, Json};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::routing::{is_valid_subdomain_label, sanitize_hostname, CUSTOM_DOMAIN_SEGMENT};

/// How a status page was addressed
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusPageKind {
    Subdomain,
    CustomDomain,
}

/// Resolved status-page target
#[derive(Debug, Serialize)]
pub struct StatusPageTarget {
    pub kind: StatusPageKind,
    pub identifier: String,
    pub path: String,
}

/// Status page landing for `/status/{label}/...` and
/// `/status/_custom/{domain}/...`
pub async fn status_page(Path(target): Path<String>) -> ApiResult<Json<StatusPageTarget>> {
    parse_target(&target).map(Json).ok_or(ApiError::NotFound)
}

fn parse_target(target: &str) -> Option<StatusPageTarget> {
    let (first, rest) = split_segment(target);

    let (kind, identifier, rest) = if first == CUSTOM_DOMAIN_SEGMENT {
        let (domain, rest) = split_segment(rest);
        if domain.is_empty() || sanitize_hostname(domain) != domain {
            return None;
        }
        (StatusPageKind::CustomDomain, domain, rest)
    } else {
        if !is_valid_subdomain_label(first) {
            return None;
        }
        (StatusPageKind::Subdomain, first, rest)
    };

    Some(StatusPageTarget {
        kind,
        identifier: identifier.to_string(),
        path: format!("/{}", rest),
    })
}

/// Split off the first path segment, ignoring a leading slash
fn split_segment(path: &str) -> (&str, &str) {
    let path = path.trim_start_matches('/');
    path.split_once('/').unwrap_or((path, ""))
}
