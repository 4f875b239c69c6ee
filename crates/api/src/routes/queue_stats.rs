//! Execution queue statistics endpoints

use axum::{
    extract::State,
    http::HeaderMap,
    response::{sse::Sse, IntoResponse},
    Json,
};
use supercheck_shared::QueueStats;

use crate::auth::resolve_org_best_effort;
use crate::error::ApiResult;
use crate::state::AppState;
use crate::stats::{spawn_feed, sse_headers};

/// Live stats over Server-Sent Events
///
/// Anonymous callers get platform-default limits. The server closes the
/// stream after the maximum connection duration with a reconnect hint.
pub async fn queue_stats_sse(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let org_id = resolve_org_best_effort(state.sessions.as_ref(), &headers).await;
    tracing::debug!(org_id = ?org_id, "Opening stats feed");

    let stream = spawn_feed(state.stats.clone(), org_id);
    (sse_headers(), Sse::new(stream))
}

/// One-shot stats snapshot
pub async fn queue_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<QueueStats>> {
    let org_id = resolve_org_best_effort(state.sessions.as_ref(), &headers).await;
    let stats = state.stats.snapshot(org_id).await?;
    Ok(Json(stats))
}
