//! Error types for Supercheck

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupercheckError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for shared operations
pub type SupercheckResult<T> = Result<T, SupercheckError>;
