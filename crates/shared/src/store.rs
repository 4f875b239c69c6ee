//! Redis connection management and key layout
//!
//! Queue keys follow BullMQ's layout (`bull:<queue>:<state>`) since the
//! execution queues are written by the BullMQ-compatible schedulers.

use redis::aio::ConnectionManager;
use redis::Client;
use uuid::Uuid;

use crate::error::SupercheckResult;

/// Prefix BullMQ uses for all queue keys
pub const BULL_PREFIX: &str = "bull";

/// Create a Redis connection manager.
///
/// The manager reconnects transparently, so one instance is shared for the
/// lifetime of the process.
pub async fn create_connection_manager(redis_url: &str) -> SupercheckResult<ConnectionManager> {
    let client = Client::open(redis_url)?;
    let manager = ConnectionManager::new(client).await?;
    Ok(manager)
}

/// List of jobs currently being processed
pub fn active_key(queue: &str) -> String {
    format!("{}:{}:active", BULL_PREFIX, queue)
}

/// List of jobs waiting for a worker
pub fn waiting_key(queue: &str) -> String {
    format!("{}:{}:wait", BULL_PREFIX, queue)
}

/// Sorted set of waiting jobs with a priority
pub fn prioritized_key(queue: &str) -> String {
    format!("{}:{}:prioritized", BULL_PREFIX, queue)
}

/// Hash holding per-organization capacity overrides
pub fn org_limits_key(org_id: Uuid) -> String {
    format!("supercheck:org_limits:{}", org_id)
}
