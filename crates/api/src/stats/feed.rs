//! Adaptive stats feed
//!
//! One task per connection polls the stats provider and pushes messages into
//! a channel drained by the SSE response body. The poll interval backs off
//! while the snapshot is unchanged and snaps back when it changes. Heartbeats
//! run on their own fixed timer. After [`MAX_CONNECTION_DURATION`] the client
//! is told to reconnect and the feed ends.
//!
//! Every unchanged poll still emits a snapshot; change detection only drives
//! the schedule.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::provider::StatsProvider;

/// Poll interval at connection start and after any change
pub const INITIAL_POLL_INTERVAL: Duration = Duration::from_millis(1_000);

/// Poll interval ceiling
pub const MAX_POLL_INTERVAL: Duration = Duration::from_millis(10_000);

/// Growth factor applied per unchanged poll
pub const BACKOFF_MULTIPLIER: f64 = 1.5;

/// Connection lifetime before the client is asked to reconnect
pub const MAX_CONNECTION_DURATION: Duration = Duration::from_millis(300_000);

/// Keep-alive comment interval
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(30_000);

/// Reconnect delay advertised in the reconnect hint
pub const RECONNECT_DELAY: Duration = Duration::from_millis(1_000);

/// Messages produced by a feed, in emission order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMessage {
    /// Serialized stats snapshot
    Snapshot(String),
    /// Keep-alive for intermediate proxies
    Heartbeat,
    /// Final message before a server-initiated close
    Reconnect { retry_after: Duration },
}

/// Why a feed stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    /// Client went away (cancellation signalled)
    ClientDisconnected,
    /// Connection hit its maximum lifetime; reconnect hint sent
    MaxDurationReached,
    /// The message channel was closed under us
    WriteFailed,
}

/// Poll interval with multiplicative backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdaptiveInterval {
    current: Duration,
}

impl Default for AdaptiveInterval {
    fn default() -> Self {
        Self::new()
    }
}

impl AdaptiveInterval {
    pub fn new() -> Self {
        Self {
            current: INITIAL_POLL_INTERVAL,
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    /// Grow after an unchanged poll, capped at [`MAX_POLL_INTERVAL`]
    pub fn back_off(&mut self) -> Duration {
        let next_ms = (self.current.as_millis() as f64 * BACKOFF_MULTIPLIER) as u64;
        self.current = Duration::from_millis(next_ms).min(MAX_POLL_INTERVAL);
        self.current
    }

    /// Snap back after a change
    pub fn reset(&mut self) -> Duration {
        self.current = INITIAL_POLL_INTERVAL;
        self.current
    }

    /// Apply the result of one poll
    pub fn observe(&mut self, changed: bool) -> Duration {
        if changed {
            self.reset()
        } else {
            self.back_off()
        }
    }
}

/// Run a feed until the client disconnects, the channel closes or the
/// connection reaches its maximum lifetime.
pub async fn run_feed(
    provider: Arc<dyn StatsProvider>,
    org_id: Option<Uuid>,
    tx: mpsc::Sender<FeedMessage>,
    cancel: CancellationToken,
) -> FeedOutcome {
    let started = Instant::now();
    let mut schedule = AdaptiveInterval::new();
    let mut last_snapshot: Option<String> = None;

    // Initial snapshot, outside the poll schedule
    if let Some(snapshot) = fetch_snapshot(provider.as_ref(), org_id).await {
        if cancel.is_cancelled() {
            return FeedOutcome::ClientDisconnected;
        }
        if tx.send(FeedMessage::Snapshot(snapshot.clone())).await.is_err() {
            return FeedOutcome::WriteFailed;
        }
        last_snapshot = Some(snapshot);
    }

    let mut heartbeat = interval_at(started + HEARTBEAT_INTERVAL, HEARTBEAT_INTERVAL);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let poll = sleep(schedule.current());
    tokio::pin!(poll);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                return FeedOutcome::ClientDisconnected;
            }

            _ = heartbeat.tick() => {
                if tx.send(FeedMessage::Heartbeat).await.is_err() {
                    return FeedOutcome::WriteFailed;
                }
            }

            _ = &mut poll => {
                // Checked per poll: the hint lands at most MAX_POLL_INTERVAL late
                if started.elapsed() >= MAX_CONNECTION_DURATION {
                    // Best effort: the client may already be gone
                    let _ = tx
                        .send(FeedMessage::Reconnect {
                            retry_after: RECONNECT_DELAY,
                        })
                        .await;
                    return FeedOutcome::MaxDurationReached;
                }

                // A failed fetch emits nothing and keeps the current interval
                if let Some(snapshot) = fetch_snapshot(provider.as_ref(), org_id).await {
                    if cancel.is_cancelled() {
                        return FeedOutcome::ClientDisconnected;
                    }
                    let changed = last_snapshot.as_deref() != Some(snapshot.as_str());
                    schedule.observe(changed);
                    last_snapshot = Some(snapshot.clone());

                    if tx.send(FeedMessage::Snapshot(snapshot)).await.is_err() {
                        return FeedOutcome::WriteFailed;
                    }
                }

                poll.as_mut().reset(Instant::now() + schedule.current());
            }
        }
    }
}

/// Fetch and serialize a snapshot. Errors are logged and swallowed so a
/// transient backend failure never reaches the client.
async fn fetch_snapshot(provider: &dyn StatsProvider, org_id: Option<Uuid>) -> Option<String> {
    let stats = match provider.snapshot(org_id).await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::debug!(org_id = ?org_id, error = %e, "Stats snapshot failed, skipping tick");
            return None;
        }
    };

    match serde_json::to_string(&stats) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to serialize stats snapshot");
            None
        }
    }
}
