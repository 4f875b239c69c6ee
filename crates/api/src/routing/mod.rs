//! Host-based routing for status pages
//!
//! This module rewrites incoming requests by hostname, enabling
//! tenant-specific status page URLs like:
//! - Generated subdomains: 3f9a1c.supercheck.io
//! - Custom domains: status.company.com

mod cache;
mod host_resolver;
mod middleware;

pub use cache::{CacheStats, HostnameCache, DEFAULT_CACHE_CAPACITY};
pub use host_resolver::{
    is_bypassed, is_valid_subdomain_label, normalize_host, sanitize_hostname,
    HostClassification, HostRouter, RouteDecision, CUSTOM_DOMAIN_SEGMENT, STATUS_ROUTE_PREFIX,
};
pub use middleware::{host_routing_middleware, request_host, X_FORWARDED_HOST};
