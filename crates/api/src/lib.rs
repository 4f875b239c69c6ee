//! Supercheck API Library
//!
//! Hostname-based status-page routing and the live execution stats feed.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod routing;
pub mod security;
pub mod state;
pub mod stats;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use routing::{HostClassification, HostRouter, RouteDecision};
pub use state::AppState;
