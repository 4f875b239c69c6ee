//! Execution queue statistics source
//!
//! The feed treats the provider as opaque: it asks for a snapshot for an
//! optional organization and serializes whatever comes back.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use supercheck_shared::store::{active_key, org_limits_key, prioritized_key, waiting_key};
use supercheck_shared::{CapacityLimits, CapacityOverrides, QueueStats};
use uuid::Uuid;

use crate::config::Config;

/// Error type for stats operations
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

/// Source of queue statistics snapshots
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// Current snapshot; `org_id` selects org-specific capacity limits
    async fn snapshot(&self, org_id: Option<Uuid>) -> Result<QueueStats, StatsError>;

    /// Check the backing store is reachable
    async fn health_check(&self) -> Result<(), StatsError> {
        Ok(())
    }
}

/// Reads queue depths from BullMQ keys and capacity overrides from Redis
#[derive(Clone)]
pub struct RedisStatsProvider {
    conn: ConnectionManager,
    queues: Vec<String>,
    defaults: CapacityLimits,
}

impl RedisStatsProvider {
    pub fn new(conn: ConnectionManager, queues: Vec<String>, defaults: CapacityLimits) -> Self {
        Self {
            conn,
            queues,
            defaults,
        }
    }

    pub fn from_config(conn: ConnectionManager, config: &Config) -> Self {
        Self::new(conn, config.queue_names.clone(), config.default_limits())
    }

    /// Capacity limits for an org. Any failure falls back to the defaults.
    async fn limits_for(&self, org_id: Option<Uuid>) -> CapacityLimits {
        let Some(org_id) = org_id else {
            return self.defaults;
        };

        let mut conn = self.conn.clone();
        let result: redis::RedisResult<(Option<u32>, Option<u32>)> = redis::cmd("HMGET")
            .arg(org_limits_key(org_id))
            .arg("running_capacity")
            .arg("queued_capacity")
            .query_async(&mut conn)
            .await;

        match result {
            Ok((running_capacity, queued_capacity)) => CapacityOverrides {
                running_capacity,
                queued_capacity,
            }
            .resolve(self.defaults),
            Err(e) => {
                tracing::debug!(org_id = %org_id, error = %e, "Capacity override lookup failed, using defaults");
                self.defaults
            }
        }
    }
}

#[async_trait]
impl StatsProvider for RedisStatsProvider {
    async fn snapshot(&self, org_id: Option<Uuid>) -> Result<QueueStats, StatsError> {
        let mut conn = self.conn.clone();

        let mut pipe = redis::pipe();
        for queue in &self.queues {
            pipe.llen(active_key(queue))
                .llen(waiting_key(queue))
                .zcard(prioritized_key(queue));
        }
        let counts: Vec<u64> = pipe.query_async(&mut conn).await?;

        let (running, queued) = sum_queue_counts(&counts)?;
        let limits = self.limits_for(org_id).await;

        Ok(QueueStats::new(running, queued, limits))
    }

    async fn health_check(&self) -> Result<(), StatsError> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(StatsError::InvalidResponse(pong))
        }
    }
}

/// Fold per-queue `[active, wait, prioritized]` triples into totals
fn sum_queue_counts(counts: &[u64]) -> Result<(u64, u64), StatsError> {
    if counts.len() % 3 != 0 {
        return Err(StatsError::InvalidResponse(format!(
            "expected 3 counts per queue, got {}",
            counts.len()
        )));
    }

    Ok(counts
        .chunks_exact(3)
        .fold((0, 0), |(running, queued), chunk| match chunk {
            [active, wait, prioritized] => (running + active, queued + wait + prioritized),
            _ => (running, queued),
        }))
}
