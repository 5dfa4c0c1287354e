//! Expiring codes with TTL semantics equivalent to a Redis key.
//!
//! Deadlines use `tokio::time::Instant` so tests can drive expiry with a
//! paused clock.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::domain::StoreError;
use crate::ports::otp_store::OtpStore;

#[derive(Debug)]
struct Entry {
    code: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct MemoryOtpStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Drop `subject` if its deadline has passed, then return the live entry.
fn live<'a>(entries: &'a mut HashMap<String, Entry>, subject: &str) -> Option<&'a mut Entry> {
    let now = Instant::now();
    if entries.get(subject).is_some_and(|e| e.expires_at <= now) {
        entries.remove(subject);
    }
    entries.get_mut(subject)
}

#[async_trait]
impl OtpStore for MemoryOtpStore {
    async fn get(&self, subject: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock().await;
        Ok(live(&mut entries, subject).map(|e| e.code.clone()))
    }

    async fn touch(&self, subject: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().await;
        Ok(match live(&mut entries, subject) {
            Some(entry) => {
                entry.expires_at = Instant::now() + ttl;
                true
            }
            None => false,
        })
    }

    async fn put(&self, subject: &str, code: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            subject.to_string(),
            Entry {
                code: code.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn remove(&self, subject: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().await;
        let present = live(&mut entries, subject).is_some();
        Ok(present && entries.remove(subject).is_some())
    }
}
