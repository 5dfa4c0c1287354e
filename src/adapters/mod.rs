//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (PostgreSQL, Redis, outbound HTTP) and exposes
//! the use cases over axum. Each sub-module groups adapters by
//! infrastructure concern.
//!
//! Adapter categories:
//! - `api`: football-data.org REST client and mail dispatch
//! - `http`: public REST API (axum)
//! - `memory`: in-process stores for every storage port
//! - `metrics`: Prometheus metrics export and health checks
//! - `persistence`: PostgreSQL via sqlx
//! - `redis_store`: order streams and OTP keys in Redis

pub mod api;
pub mod http;
pub mod memory;
pub mod metrics;
pub mod persistence;
pub mod redis_store;
