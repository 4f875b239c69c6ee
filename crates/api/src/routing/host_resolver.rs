//! Hostname-to-Route Resolution
//!
//! Classifies the incoming Host header and decides which internal path
//! serves the request:
//! - Main application host: app.supercheck.io -> unchanged
//! - Generated status-page subdomain: 3f9a1c.supercheck.io -> /status/3f9a1c/...
//! - Customer custom domain: status.company.com -> /status/_custom/status.company.com/...
//!
//! No database lookup or authentication happens here. The page handlers
//! behind the rewritten path check that the identifier is a published page.

use std::sync::{Arc, OnceLock};

use crate::config::Config;

use super::HostnameCache;

/// Root of all status-page routes
pub const STATUS_ROUTE_PREFIX: &str = "/status";

/// Path segment marking a custom-domain status page
pub const CUSTOM_DOMAIN_SEGMENT: &str = "_custom";

/// Path prefixes that never go through host routing
pub const BYPASS_PREFIXES: &[&str] = &["/api", "/_next", "/static", "/assets"];

/// Exact paths that never go through host routing
pub const BYPASS_PATHS: &[&str] = &["/favicon.ico", "/robots.txt"];

/// Maximum DNS label length
const MAX_LABEL_LEN: usize = 63;

/// How a hostname was classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostClassification {
    /// The main application (or a local development host)
    MainApp,
    /// Generated status-page subdomain under the platform suffix
    StatusPageSubdomain(String),
    /// Customer-owned hostname, already sanitized
    CustomDomain(String),
    /// Nothing matched; serve the request as-is
    Passthrough,
}

/// Result of routing one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    pub classification: HostClassification,
    /// Internal path to serve instead of the requested one.
    /// `None` means the request passes through unchanged.
    pub rewrite_to: Option<String>,
}

impl RouteDecision {
    fn pass(classification: HostClassification) -> Self {
        Self {
            classification,
            rewrite_to: None,
        }
    }

    pub fn is_rewrite(&self) -> bool {
        self.rewrite_to.is_some()
    }
}

/// Host router with its own hostname cache and memoized main hostname
pub struct HostRouter {
    app_url: Option<String>,
    main_hostname: OnceLock<Option<String>>,
    status_page_domain: Option<String>,
    cache: Arc<HostnameCache>,
}

impl HostRouter {
    /// Create a new host router
    pub fn new(app_url: Option<String>, status_page_domain: Option<String>) -> Self {
        Self::with_cache(app_url, status_page_domain, Arc::new(HostnameCache::new()))
    }

    /// Create a new host router with a custom cache
    pub fn with_cache(
        app_url: Option<String>,
        status_page_domain: Option<String>,
        cache: Arc<HostnameCache>,
    ) -> Self {
        let status_page_domain = status_page_domain
            .map(|d| d.trim().trim_start_matches('.').to_lowercase())
            .filter(|d| !d.is_empty());

        Self {
            app_url,
            main_hostname: OnceLock::new(),
            status_page_domain,
            cache,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.app_url.clone(), config.status_page_domain.clone())
    }

    /// Route a request given its raw host header value and path
    pub fn route(&self, raw_host: &str, path: &str) -> RouteDecision {
        if is_bypassed(path) {
            return RouteDecision::pass(HostClassification::Passthrough);
        }

        let host = self.clean_host(raw_host);
        let classification = self.classify(&host);

        let rewrite_to = match &classification {
            HostClassification::StatusPageSubdomain(label) => {
                rewrite_path(&format!("{}/{}", STATUS_ROUTE_PREFIX, label), path)
            }
            HostClassification::CustomDomain(domain) => rewrite_path(
                &format!("{}/{}/{}", STATUS_ROUTE_PREFIX, CUSTOM_DOMAIN_SEGMENT, domain),
                path,
            ),
            HostClassification::MainApp | HostClassification::Passthrough => None,
        };

        RouteDecision {
            classification,
            rewrite_to,
        }
    }

    /// Classify an already-cleaned hostname
    pub fn classify(&self, host: &str) -> HostClassification {
        if host.is_empty() {
            return HostClassification::Passthrough;
        }

        let main = self.main_hostname();
        if main == Some(host) || host.starts_with("localhost") {
            return HostClassification::MainApp;
        }

        if let Some(suffix) = &self.status_page_domain {
            if let Some(label) = host
                .strip_suffix(suffix.as_str())
                .and_then(|rest| rest.strip_suffix('.'))
            {
                if is_valid_subdomain_label(label) {
                    return HostClassification::StatusPageSubdomain(label.to_string());
                }
                tracing::debug!(host = %host, "Rejected malformed status-page subdomain");
            }
        }

        if self.is_custom_domain(host, main) {
            let sanitized = sanitize_hostname(host);
            if !sanitized.is_empty() {
                return HostClassification::CustomDomain(sanitized);
            }
        }

        HostClassification::Passthrough
    }

    /// Main application hostname, derived from the app URL on first use.
    /// An unparsable URL memoizes `None` for the lifetime of the router.
    pub fn main_hostname(&self) -> Option<&str> {
        self.main_hostname
            .get_or_init(|| {
                let app_url = self.app_url.as_deref()?;
                match url::Url::parse(app_url) {
                    Ok(parsed) => parsed.host_str().map(|h| h.to_lowercase()),
                    Err(e) => {
                        tracing::warn!(app_url = %app_url, error = %e, "Invalid APP_URL, main hostname unknown");
                        None
                    }
                }
            })
            .as_deref()
    }

    /// Get the hostname cache for statistics/management
    pub fn cache(&self) -> &HostnameCache {
        &self.cache
    }

    fn clean_host(&self, raw: &str) -> String {
        self.cache.get_or_insert_with(raw, || normalize_host(raw))
    }

    fn is_custom_domain(&self, host: &str, main: Option<&str>) -> bool {
        if main == Some(host) || is_loopback(host) {
            return false;
        }
        match &self.status_page_domain {
            Some(suffix) => host != suffix && !host.ends_with(&format!(".{}", suffix)),
            None => true,
        }
    }
}

/// Whether a path skips host routing entirely
pub fn is_bypassed(path: &str) -> bool {
    BYPASS_PATHS.contains(&path)
        || BYPASS_PREFIXES.iter().any(|prefix| {
            path == *prefix
                || path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
}

/// Normalize a host header value: strip the port and the root dot of an
/// absolute name, lowercase
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();

    // Bracketed IPv6, e.g. [::1]:3000
    if host.starts_with('[') {
        if let Some(end) = host.find(']') {
            return host[..=end].to_lowercase();
        }
    }

    let host = match host.rsplit_once(':') {
        Some((name, port))
            if !name.contains(':') && port.chars().all(|c| c.is_ascii_digit()) =>
        {
            name
        }
        _ => host,
    };
    host.strip_suffix('.').unwrap_or(host).to_lowercase()
}

/// A generated subdomain label: 1-63 characters of `[A-Za-z0-9-]`
pub fn is_valid_subdomain_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Strip everything outside `[A-Za-z0-9.-]`
pub fn sanitize_hostname(host: &str) -> String {
    host.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '-')
        .collect()
}

fn is_loopback(host: &str) -> bool {
    host.starts_with("localhost")
        || matches!(host, "127.0.0.1" | "0.0.0.0" | "[::1]" | "::1")
}

/// Map a request path onto a status-page root.
/// `/` serves the root, paths already under the root pass through,
/// anything else is prefixed.
fn rewrite_path(root: &str, path: &str) -> Option<String> {
    if path.is_empty() || path == "/" {
        return Some(root.to_string());
    }
    if path == root
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
    {
        return None;
    }
    Some(format!("{}{}", root, path))
}
