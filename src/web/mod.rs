//! Web server module exposing the metrics endpoint.

mod handlers;

use crate::metrics::MetricRegistry;

use axum::{routing::get, Router};
use std::future::Future;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: MetricRegistry,
}

/// Web server serving the current gauge values.
pub struct Server {
    port: u16,
    state: AppState,
}

impl Server {
    pub fn new(port: u16, registry: MetricRegistry) -> Self {
        Self {
            port,
            state: AppState { registry },
        }
    }

    /// Build the router with all routes.
    fn routes(&self) -> Router {
        Router::new()
            .route("/metrics", get(handlers::handle_metrics))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve until `shutdown` resolves.
    pub async fn start<F>(&self, shutdown: F) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let router = self.routes();

        tracing::info!("Metrics server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Metrics server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::HealthMetrics;
    use crate::probe::{PhaseTimings, ProbeResult};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_metrics_route() {
        let registry = MetricRegistry::new();
        let metrics = HealthMetrics::register(&registry).unwrap();
        let timings = PhaseTimings {
            total_ms: 42,
            ..PhaseTimings::default()
        };
        let result = ProbeResult::new("http://example.com", 1, timings);
        metrics.record_probe(&result);

        let router = Server::new(0, registry).routes();
        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("sample_external_url_up{url=\"http://example.com\"} 1"));
        assert!(text.contains("sample_external_url_response_ms{url=\"http://example.com\"} 42"));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let router = Server::new(0, MetricRegistry::new()).routes();
        let response = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
