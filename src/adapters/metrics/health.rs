//! Health Check Server - Liveness and Readiness Probes
//!
//! Exposes /live, /ready and (when a registry is attached) /metrics.
//! Readiness flips to 503 as soon as graceful shutdown begins.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::sync::broadcast;
use tracing::{info, instrument};

use super::prometheus::MetricsRegistry;

/// Shared health state polled by readiness probes.
#[derive(Debug, Clone)]
pub struct HealthState {
    /// Whether the API accepts traffic (false once shutdown starts).
    accepting: Arc<AtomicBool>,
}

impl HealthState {
    /// Create a new health state (ready by default).
    pub fn new() -> Self {
        Self {
            accepting: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.accepting.load(Ordering::Relaxed)
    }

    /// Mark the service as draining.
    pub fn set_draining(&self) {
        self.accepting.store(false, Ordering::Relaxed);
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

/// Axum-based probe and metrics server.
pub struct HealthServer {
    state: HealthState,
    metrics: Option<Arc<MetricsRegistry>>,
    bind_address: String,
}

impl HealthServer {
    pub fn new(state: HealthState, metrics: Option<Arc<MetricsRegistry>>, bind_address: String) -> Self {
        Self {
            state,
            metrics,
            bind_address,
        }
    }

    /// Probe routes, plus `/metrics` when a registry is attached.
    pub fn router(&self) -> Router {
        let probes = Router::new()
            .route("/live", get(Self::liveness))
            .route("/ready", get(Self::readiness))
            .with_state(self.state.clone());

        match &self.metrics {
            Some(registry) => probes.merge(registry.router()),
            None => probes,
        }
    }

    /// Run until the shutdown broadcast fires.
    #[instrument(skip(self, shutdown_rx), fields(address = %self.bind_address))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(&self.bind_address).await?;

        info!(address = %self.bind_address, "Health server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }

    /// Liveness probe: always returns 200 if the process is running.
    async fn liveness() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    /// Readiness probe: 503 once draining.
    async fn readiness(State(state): State<HealthState>) -> impl IntoResponse {
        if state.is_ready() {
            (StatusCode::OK, "READY")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_readiness_flips_when_draining() {
        let state = HealthState::new();
        let server = HealthServer::new(state.clone(), None, "127.0.0.1:0".into());

        let resp = server
            .router()
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        state.set_draining();
        let resp = server
            .router()
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_metrics_route_present_with_registry() {
        let registry = Arc::new(MetricsRegistry::new().unwrap());
        registry.orders_appended.with_label_values(&["ok"]).inc();
        let server = HealthServer::new(HealthState::new(), Some(registry), "127.0.0.1:0".into());
        let resp = server
            .router()
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
