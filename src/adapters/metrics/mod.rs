//! Metrics and Monitoring Adapters
//!
//! Prometheus metrics export and health check endpoints (/live,
//! /ready) via axum 0.7, served on their own address so probes keep
//! answering while the API is saturated.

pub mod health;
pub mod prometheus;

pub use health::{HealthServer, HealthState};
pub use self::prometheus::MetricsRegistry;
