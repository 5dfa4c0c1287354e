//! Redis Adapters
//!
//! Order logs are Redis streams (`XADD`/`XLEN`/`XRANGE`); OTPs are plain
//! string keys with a TTL. Both share one multiplexed
//! `ConnectionManager`, which reconnects on its own and is cheap to
//! clone per call.

pub mod order_log;
pub mod otp_store;

use anyhow::{Context, Result};
use ::redis::aio::ConnectionManager;
use tracing::info;

pub use order_log::RedisOrderLog;
pub use otp_store::RedisOtpStore;

/// Open a managed connection to `url`.
pub async fn connect(url: &str) -> Result<ConnectionManager> {
    let client = ::redis::Client::open(url).context("Invalid Redis URL")?;
    let manager = ConnectionManager::new(client)
        .await
        .context("Failed to connect to Redis")?;
    info!("Redis connected");
    Ok(manager)
}
