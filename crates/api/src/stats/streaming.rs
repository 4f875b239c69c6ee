//! SSE (Server-Sent Events) plumbing for the stats feed
//!
//! Spawns the per-connection feed task and adapts its channel into an axum
//! `Sse` body. The body owns the drop guard of the feed's cancellation
//! token, so when the client disconnects and hyper drops the body, the feed
//! task is cancelled along with both of its timers.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::http::{header, HeaderName, HeaderValue};
use axum::response::sse::Event;
use futures::Stream;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use uuid::Uuid;

use super::feed::{run_feed, FeedMessage, MAX_CONNECTION_DURATION};
use super::provider::StatsProvider;

/// Header advertising the server-side connection lifetime in milliseconds
pub const X_MAX_CONNECTION_DURATION: HeaderName =
    HeaderName::from_static("x-max-connection-duration");

/// Messages buffered between the feed task and the response body
const FEED_CHANNEL_CAPACITY: usize = 16;

/// Convert a feed message into its SSE wire form
pub fn to_sse_event(message: FeedMessage) -> Event {
    match message {
        FeedMessage::Snapshot(json) => Event::default().data(json),
        FeedMessage::Heartbeat => Event::default().comment("heartbeat"),
        FeedMessage::Reconnect { retry_after } => Event::default()
            .retry(retry_after)
            .data(reconnect_payload(retry_after)),
    }
}

/// JSON body of the reconnect hint
pub fn reconnect_payload(retry_after: Duration) -> String {
    json!({
        "type": "reconnect",
        "reason": "max_duration",
        "retryAfterMs": retry_after.as_millis() as u64,
    })
    .to_string()
}

/// Response headers for the event stream
pub fn sse_headers() -> [(HeaderName, HeaderValue); 5] {
    [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/event-stream"),
        ),
        (
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-transform"),
        ),
        (header::CONNECTION, HeaderValue::from_static("keep-alive")),
        (
            HeaderName::from_static("x-accel-buffering"),
            HeaderValue::from_static("no"),
        ),
        (
            X_MAX_CONNECTION_DURATION,
            HeaderValue::from(MAX_CONNECTION_DURATION.as_millis() as u64),
        ),
    ]
}

/// SSE body draining a feed channel
pub struct FeedEventStream {
    messages: ReceiverStream<FeedMessage>,
    _disconnect: DropGuard,
}

impl FeedEventStream {
    pub fn new(rx: mpsc::Receiver<FeedMessage>, disconnect: DropGuard) -> Self {
        Self {
            messages: ReceiverStream::new(rx),
            _disconnect: disconnect,
        }
    }
}

impl Stream for FeedEventStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.messages)
            .poll_next(cx)
            .map(|message| message.map(|m| Ok(to_sse_event(m))))
    }
}

/// Start a feed for one connection and return its response body
pub fn spawn_feed(provider: Arc<dyn StatsProvider>, org_id: Option<Uuid>) -> FeedEventStream {
    let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();

    tokio::spawn(async move {
        let outcome = run_feed(provider, org_id, tx, task_cancel).await;
        tracing::debug!(org_id = ?org_id, outcome = ?outcome, "Stats feed closed");
    });

    FeedEventStream::new(rx, cancel.drop_guard())
}
