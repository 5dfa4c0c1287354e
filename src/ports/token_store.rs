//! Token Store Port - Refresh Token Persistence
//!
//! Refresh secrets are never stored in plaintext: a record carries only
//! the salted hash. Revocation is logical, records are never deleted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::StoreError;

/// A persisted refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRefreshToken {
  pub id: Uuid,
  pub user_id: Uuid,
  /// bcrypt hash of the secret.
  pub secret_hash: String,
  pub expires_at: DateTime<Utc>,
  pub revoked: bool,
}

impl StoredRefreshToken {
  /// Usable for issuance: not revoked and not past its expiry.
  pub fn is_active(&self, now: DateTime<Utc>) -> bool {
    !self.revoked && self.expires_at > now
  }
}

#[async_trait]
pub trait TokenStore: Send + Sync + 'static {
  /// Persist a freshly issued token.
  async fn insert(&self, token: &StoredRefreshToken) -> Result<(), StoreError>;

  /// All of a user's tokens that are not revoked and expire after `now`.
  async fn active_for_user(
    &self,
    user_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<Vec<StoredRefreshToken>, StoreError>;

  /// Mark one token revoked. Returns `false` if no unrevoked record
  /// with that id existed.
  async fn revoke(&self, token_id: Uuid) -> Result<bool, StoreError>;
}
