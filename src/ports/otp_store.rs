//! OTP Store Port - Expiring Key/Value Codes
//!
//! At most one code per subject. Expired entries must be invisible to
//! every operation, exactly like a TTL'd key.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::StoreError;

#[async_trait]
pub trait OtpStore: Send + Sync + 'static {
  /// The active code for `subject`, if any.
  async fn get(&self, subject: &str) -> Result<Option<String>, StoreError>;

  /// Reset the expiry of an existing code. Returns `false` when no
  /// active code exists (e.g. it expired between read and touch).
  async fn touch(&self, subject: &str, ttl: Duration) -> Result<bool, StoreError>;

  /// Store `code` for `subject`, replacing any previous one.
  async fn put(&self, subject: &str, code: &str, ttl: Duration) -> Result<(), StoreError>;

  /// Delete the code. Returns `false` if nothing was removed.
  async fn remove(&self, subject: &str) -> Result<bool, StoreError>;
}
