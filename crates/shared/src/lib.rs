//! Supercheck Shared Types and Utilities
//!
//! This crate contains types, errors, and Redis helpers shared by the API
//! server and the background worker.

pub mod error;
pub mod store;
pub mod types;

pub use error::*;
pub use store::create_connection_manager;
pub use types::*;
