//! Persistence Adapters - PostgreSQL via sqlx
//!
//! One `PgStore` over a connection pool implements every relational
//! port. Queries are runtime-checked (`sqlx::query`) against the schema
//! in `sql/schema.sql`; multi-row writes that must be atomic run inside
//! a single transaction.

pub mod football;
pub mod markets;
pub mod tokens;
pub mod users;

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::domain::StoreError;

/// PostgreSQL-backed store for users, wallets, tokens, markets and
/// football metadata.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect a pool of at most `max_connections`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await
            .context("Failed to connect to PostgreSQL")?;
        info!(max_connections, "PostgreSQL pool ready");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a driver error onto the storage error taxonomy.
///
/// `what` names the entity for conflict messages.
pub(crate) fn classify(err: sqlx::Error, what: &str) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(what.to_string())
        }
        other => StoreError::backend(other),
    }
}
