//! Common types used across Supercheck

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Execution Capacity
// =============================================================================

/// Per-organization capacity overrides.
/// `None` means "use the platform default"
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CapacityOverrides {
    pub running_capacity: Option<u32>,
    pub queued_capacity: Option<u32>,
}

impl CapacityOverrides {
    /// Apply these overrides on top of the platform defaults
    pub fn resolve(&self, defaults: CapacityLimits) -> CapacityLimits {
        CapacityLimits {
            running_capacity: self.running_capacity.unwrap_or(defaults.running_capacity),
            queued_capacity: self.queued_capacity.unwrap_or(defaults.queued_capacity),
        }
    }
}

/// Effective execution limits for an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityLimits {
    pub running_capacity: u32,
    pub queued_capacity: u32,
}

impl CapacityLimits {
    pub fn new(running_capacity: u32, queued_capacity: u32) -> Self {
        Self {
            running_capacity,
            queued_capacity,
        }
    }
}

/// Point-in-time view of execution queues, as pushed to dashboards.
///
/// Serialized with camelCase keys. The serialized form is what change
/// detection compares, so it must not carry a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub running: u64,
    pub running_capacity: u32,
    pub queued: u64,
    pub queued_capacity: u32,
}

impl QueueStats {
    pub fn new(running: u64, queued: u64, limits: CapacityLimits) -> Self {
        Self {
            running,
            running_capacity: limits.running_capacity,
            queued,
            queued_capacity: limits.queued_capacity,
        }
    }
}

// =============================================================================
// Webhooks
// =============================================================================

/// A webhook delivery request waiting on the queue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookJob {
    pub id: Uuid,
    pub url: String,
    /// Event name, e.g. "monitor.down"
    pub event: String,
    pub payload: serde_json::Value,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl WebhookJob {
    pub fn new(url: impl Into<String>, event: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            event: event.into(),
            payload,
            attempts: 0,
            last_error: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}
