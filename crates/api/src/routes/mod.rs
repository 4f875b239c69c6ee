//! API routes

pub mod health;
pub mod queue_stats;
pub mod status_pages;

use axum::{middleware, routing::get, Router};
use tower::Layer;
use tower_http::trace::TraceLayer;

use crate::{routing::host_routing_middleware, state::AppState};

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    // Health check routes (at root level for infrastructure monitoring)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    let api_routes = Router::new()
        .route("/queue-stats", get(queue_stats::queue_stats))
        .route("/queue-stats/sse", get(queue_stats::queue_stats_sse));

    // Targets of host rewrites
    let status_routes = Router::new().route("/*target", get(status_pages::status_page));

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .nest("/status", status_routes)
        .with_state(state)
}

/// Full application: host routing in front of the router
///
/// The host middleware wraps the router as a service rather than being
/// added with `Router::layer`, so rewritten URIs take part in matching.
pub fn build_app(state: AppState) -> Router {
    let host_routing =
        middleware::from_fn_with_state(state.host_router.clone(), host_routing_middleware);

    Router::new()
        .fallback_service(host_routing.layer(create_router(state)))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use futures::StreamExt;
    use supercheck_shared::{CapacityLimits, QueueStats};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::auth::{SessionError, SessionResolver};
    use crate::config::Config;
    use crate::stats::{StatsError, StatsProvider};

    struct MockProvider {
        healthy: bool,
    }

    #[async_trait]
    impl StatsProvider for MockProvider {
        async fn snapshot(&self, org_id: Option<Uuid>) -> Result<QueueStats, StatsError> {
            let limits = match org_id {
                Some(_) => CapacityLimits::new(20, 200),
                None => CapacityLimits::new(5, 50),
            };
            Ok(QueueStats::new(2, 7, limits))
        }

        async fn health_check(&self) -> Result<(), StatsError> {
            if self.healthy {
                Ok(())
            } else {
                Err(StatsError::InvalidResponse("down".to_string()))
            }
        }
    }

    /// Every caller belongs to one fixed org
    struct FixedOrg(Uuid);

    #[async_trait]
    impl SessionResolver for FixedOrg {
        async fn resolve_org(
            &self,
            _headers: &axum::http::HeaderMap,
        ) -> Result<Option<Uuid>, SessionError> {
            Ok(Some(self.0))
        }
    }

    fn config() -> Config {
        Config {
            bind_address: "127.0.0.1:0".to_string(),
            app_url: Some("https://app.supercheck.io".to_string()),
            status_page_domain: Some("supercheck.io".to_string()),
            redis_url: "redis://localhost:6379".to_string(),
            session_jwt_secret: None,
            queue_names: vec!["test-execution".to_string()],
            default_running_capacity: 5,
            default_queued_capacity: 50,
        }
    }

    fn state(healthy: bool) -> AppState {
        AppState::new(config(), Arc::new(MockProvider { healthy }))
    }

    async fn send(state: AppState, host: &str, uri: &str) -> Response {
        let request = Request::builder()
            .uri(uri)
            .header(header::HOST, host)
            .body(Body::empty())
            .unwrap();
        build_app(state).oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let response = send(state(true), "app.supercheck.io", "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["redis"], "healthy");

        let response = send(state(false), "app.supercheck.io", "/health").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = send(state(false), "app.supercheck.io", "/health/live").await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(state(false), "app.supercheck.io", "/health/ready").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_subdomain_reaches_status_route() {
        let response = send(state(true), "3f9a1c.supercheck.io", "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::X_FRAME_OPTIONS).unwrap(),
            "DENY"
        );

        let body = json_body(response).await;
        assert_eq!(body["kind"], "subdomain");
        assert_eq!(body["identifier"], "3f9a1c");
        assert_eq!(body["path"], "/");
    }

    #[tokio::test]
    async fn test_custom_domain_reaches_status_route() {
        let response = send(state(true), "status.acme.com:443", "/incidents").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["kind"], "custom_domain");
        assert_eq!(body["identifier"], "status.acme.com");
        assert_eq!(body["path"], "/incidents");
    }

    #[tokio::test]
    async fn test_api_bypasses_host_routing() {
        let response = send(state(true), "status.acme.com", "/api/queue-stats").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::X_FRAME_OPTIONS).is_none());

        let body = json_body(response).await;
        assert_eq!(body["running"], 2);
        assert_eq!(body["runningCapacity"], 5);
        assert_eq!(body["queued"], 7);
        assert_eq!(body["queuedCapacity"], 50);
    }

    #[tokio::test]
    async fn test_queue_stats_uses_session_org() {
        let state = state(true).with_sessions(Arc::new(FixedOrg(Uuid::new_v4())));
        let response = send(state, "app.supercheck.io", "/api/queue-stats").await;

        let body = json_body(response).await;
        assert_eq!(body["runningCapacity"], 20);
        assert_eq!(body["queuedCapacity"], 200);
    }

    #[tokio::test]
    async fn test_sse_headers_and_initial_event() {
        let response = send(state(true), "app.supercheck.io", "/api/queue-stats/sse").await;
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "text/event-stream");
        assert_eq!(
            headers.get(header::CACHE_CONTROL).unwrap(),
            "no-cache, no-transform"
        );
        assert_eq!(headers.get("x-accel-buffering").unwrap(), "no");
        assert_eq!(headers.get("x-max-connection-duration").unwrap(), "300000");

        let mut body = response.into_body().into_data_stream();
        let frame = body.next().await.unwrap().unwrap();
        let text = String::from_utf8(frame.to_vec()).unwrap();
        assert!(text.starts_with("data: "));
        assert!(text.contains("\"runningCapacity\":5"));
    }

    #[tokio::test]
    async fn test_main_app_status_path_not_rewritten() {
        let response = send(state(true), "app.supercheck.io", "/status/_custom").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
