//! Prometheus Metrics Registry - Service Observability
//!
//! All metrics follow the naming convention `rivon_*`.

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use tracing::warn;

/// Centralized Prometheus metrics.
pub struct MetricsRegistry {
    registry: Registry,
    /// Order submissions by outcome (`ok`, `forbidden`, `invalid`, `store_error`).
    pub orders_appended: IntCounterVec,
    /// Time from validation to store acknowledgement (microseconds).
    pub append_latency_us: HistogramVec,
    /// Refresh tokens issued.
    pub refresh_tokens_issued: IntCounter,
    /// Access tokens signed.
    pub access_tokens_issued: IntCounter,
    /// OTP verification attempts by outcome (`ok`, `missing`, `mismatch`).
    pub otp_verifications: IntCounterVec,
    /// League sync batches by outcome (`ok`, `failed`).
    pub league_sync_runs: IntCounterVec,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_appended = IntCounterVec::new(
            Opts::new("rivon_orders_appended_total", "Order submissions by outcome"),
            &["outcome"],
        )?;

        let append_latency_us = HistogramVec::new(
            HistogramOpts::new(
                "rivon_order_append_latency_us",
                "Order log append latency in microseconds",
            )
            .buckets(vec![
                50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 50000.0,
            ]),
            &["backend"],
        )?;

        let refresh_tokens_issued = IntCounter::new(
            "rivon_refresh_tokens_issued_total",
            "Refresh tokens issued",
        )?;

        let access_tokens_issued = IntCounter::new(
            "rivon_access_tokens_issued_total",
            "Access tokens signed",
        )?;

        let otp_verifications = IntCounterVec::new(
            Opts::new("rivon_otp_verifications_total", "OTP verification attempts by outcome"),
            &["outcome"],
        )?;

        let league_sync_runs = IntCounterVec::new(
            Opts::new("rivon_league_sync_runs_total", "League standings sync batches"),
            &["outcome"],
        )?;

        registry.register(Box::new(orders_appended.clone()))?;
        registry.register(Box::new(append_latency_us.clone()))?;
        registry.register(Box::new(refresh_tokens_issued.clone()))?;
        registry.register(Box::new(access_tokens_issued.clone()))?;
        registry.register(Box::new(otp_verifications.clone()))?;
        registry.register(Box::new(league_sync_runs.clone()))?;

        Ok(Self {
            registry,
            orders_appended,
            append_latency_us,
            refresh_tokens_issued,
            access_tokens_issued,
            otp_verifications,
            league_sync_runs,
        })
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// `GET /metrics`.
    pub fn router(self: &Arc<Self>) -> Router {
        let metrics = Arc::clone(self);
        Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics);
                async move {
                    match metrics.render() {
                        Ok(body) => (StatusCode::OK, body),
                        Err(e) => {
                            warn!(error = %e, "Failed to encode metrics");
                            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
                        }
                    }
                }
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_counters() {
        let m = MetricsRegistry::new().unwrap();
        m.orders_appended.with_label_values(&["ok"]).inc();
        m.otp_verifications.with_label_values(&["mismatch"]).inc_by(2);
        let text = m.render().unwrap();
        assert!(text.contains("rivon_orders_appended_total{outcome=\"ok\"} 1"));
        assert!(text.contains("rivon_otp_verifications_total{outcome=\"mismatch\"} 2"));
    }
}
