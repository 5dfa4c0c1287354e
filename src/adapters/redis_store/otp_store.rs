//! OTP codes as Redis string keys with `EX` expiry.

use std::time::Duration;

use ::redis::AsyncCommands;
use ::redis::aio::ConnectionManager;
use async_trait::async_trait;

use crate::domain::StoreError;
use crate::ports::otp_store::OtpStore;

#[derive(Clone)]
pub struct RedisOtpStore {
    conn: ConnectionManager,
}

impl RedisOtpStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl OtpStore for RedisOtpStore {
    async fn get(&self, subject: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.get(subject).await.map_err(StoreError::backend)
    }

    async fn touch(&self, subject: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let secs = i64::try_from(ttl.as_secs()).map_err(StoreError::backend)?;
        conn.expire(subject, secs).await.map_err(StoreError::backend)
    }

    async fn put(&self, subject: &str, code: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.set_ex(subject, code, ttl.as_secs())
            .await
            .map_err(StoreError::backend)
    }

    async fn remove(&self, subject: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn.del(subject).await.map_err(StoreError::backend)?;
        Ok(removed > 0)
    }
}
