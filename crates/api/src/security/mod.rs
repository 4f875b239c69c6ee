//! Response hardening for tenant-facing routes

mod headers;

pub use headers::apply_status_page_headers;
