//! Token Service - Refresh Token Lifecycle and Access Tokens
//!
//! Refresh tokens: 256 random bits, base64url without padding, stored
//! only as a bcrypt hash with a 15-day horizon. Access tokens: HS256
//! JWTs carrying the user identity, valid for 10 minutes and never
//! persisted, so a revoked session keeps working until its access
//! token expires.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::metrics::MetricsRegistry;
use crate::domain::identity::{AuthProvider, Identity, User};
use crate::domain::ServiceError;
use crate::ports::token_store::{StoredRefreshToken, TokenStore};

/// Bytes of randomness in a refresh secret.
const REFRESH_SECRET_BYTES: usize = 32;

/// Lifetimes and hashing cost.
#[derive(Debug, Clone, Copy)]
pub struct TokenSettings {
  pub access_ttl: Duration,
  pub refresh_ttl: Duration,
  pub bcrypt_cost: u32,
}

impl Default for TokenSettings {
  fn default() -> Self {
    Self {
      access_ttl: Duration::minutes(10),
      refresh_ttl: Duration::days(15),
      bcrypt_cost: bcrypt::DEFAULT_COST,
    }
  }
}

/// Signed access token payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
  id: Uuid,
  name: String,
  email: String,
  verified: bool,
  provider: AuthProvider,
  profile: String,
  exp: i64,
  #[serde(rename = "issuedAt")]
  issued_at: i64,
}

impl Claims {
  fn into_identity(self) -> Identity {
    Identity {
      id: self.id,
      name: self.name,
      email: self.email,
      verified: self.verified,
      provider: self.provider,
      photo: self.profile,
    }
  }
}

pub struct TokenService {
  store: Arc<dyn TokenStore>,
  encoding: EncodingKey,
  decoding: DecodingKey,
  validation: Validation,
  settings: TokenSettings,
  metrics: Option<Arc<MetricsRegistry>>,
}

impl TokenService {
  pub fn new(store: Arc<dyn TokenStore>, secret: &str, settings: TokenSettings) -> Self {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    Self {
      store,
      encoding: EncodingKey::from_secret(secret.as_bytes()),
      decoding: DecodingKey::from_secret(secret.as_bytes()),
      validation,
      settings,
      metrics: None,
    }
  }

  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  /// Create and persist a refresh token for `user_id`.
  ///
  /// The plaintext secret is returned exactly once; only its hash is
  /// stored.
  #[instrument(skip(self))]
  pub async fn issue_refresh_token(&self, user_id: Uuid) -> Result<String, ServiceError> {
    let mut raw = [0u8; REFRESH_SECRET_BYTES];
    OsRng.fill_bytes(&mut raw);
    let secret = URL_SAFE_NO_PAD.encode(raw);

    let cost = self.settings.bcrypt_cost;
    let to_hash = secret.clone();
    let secret_hash = tokio::task::spawn_blocking(move || bcrypt::hash(to_hash, cost))
      .await
      .map_err(|e| ServiceError::internal(format!("hashing task failed: {e}")))?
      .map_err(|e| ServiceError::internal(format!("unable to hash refresh token: {e}")))?;

    let record = StoredRefreshToken {
      id: Uuid::new_v4(),
      user_id,
      secret_hash,
      expires_at: Utc::now() + self.settings.refresh_ttl,
      revoked: false,
    };
    self.store.insert(&record).await?;

    if let Some(m) = &self.metrics {
      m.refresh_tokens_issued.inc();
    }
    info!(token_id = %record.id, "Refresh token issued");
    Ok(secret)
  }

  /// Sign an access token for `user` after proving `presented_secret`
  /// matches one of the user's active refresh tokens.
  ///
  /// Does not rotate the refresh token.
  #[instrument(skip(self, user, presented_secret), fields(user_id = %user.id))]
  pub async fn issue_access_token(
    &self,
    user: &User,
    presented_secret: &str,
  ) -> Result<String, ServiceError> {
    self.match_refresh_token(user.id, presented_secret).await?;
    self.sign(&user.identity())
  }

  /// Revoke the refresh token matching `presented_secret`.
  ///
  /// Only the matched record is touched; the user's other sessions stay
  /// valid.
  #[instrument(skip(self, presented_secret))]
  pub async fn revoke(&self, user_id: Uuid, presented_secret: &str) -> Result<(), ServiceError> {
    let token = self.match_refresh_token(user_id, presented_secret).await?;
    if !self.store.revoke(token.id).await? {
      // Lost a race with a concurrent revoke of the same token.
      return Err(ServiceError::bad_request("refresh token was already revoked"));
    }
    info!(token_id = %token.id, "Refresh token revoked");
    Ok(())
  }

  /// Check signature and expiry and decode the caller's identity.
  ///
  /// No revocation re-check.
  pub fn verify_access_token(&self, token: &str) -> Result<Identity, ServiceError> {
    jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
      .map(|data| data.claims.into_identity())
      .map_err(|e| {
        debug!(error = %e, "Access token rejected");
        ServiceError::unauthorized("invalid or expired access token")
      })
  }

  /// Access token lifetime, for cookie max-age.
  pub fn access_ttl(&self) -> Duration {
    self.settings.access_ttl
  }

  /// Refresh token lifetime, for cookie max-age.
  pub fn refresh_ttl(&self) -> Duration {
    self.settings.refresh_ttl
  }

  fn sign(&self, identity: &Identity) -> Result<String, ServiceError> {
    let now = Utc::now();
    let claims = Claims {
      id: identity.id,
      name: identity.name.clone(),
      email: identity.email.clone(),
      verified: identity.verified,
      provider: identity.provider,
      profile: identity.photo.clone(),
      exp: (now + self.settings.access_ttl).timestamp(),
      issued_at: now.timestamp(),
    };
    let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
      .map_err(|e| ServiceError::internal(format!("unable to sign access token: {e}")))?;

    if let Some(m) = &self.metrics {
      m.access_tokens_issued.inc();
    }
    Ok(token)
  }

  /// Linear scan of the user's active tokens, comparing hashes.
  async fn match_refresh_token(
    &self,
    user_id: Uuid,
    presented_secret: &str,
  ) -> Result<StoredRefreshToken, ServiceError> {
    let candidates = self.store.active_for_user(user_id, Utc::now()).await?;
    if candidates.is_empty() {
      return Err(ServiceError::unauthorized("no active refresh token, please sign in again"));
    }

    let secret = presented_secret.to_string();
    let matched = tokio::task::spawn_blocking(move || {
      candidates.into_iter().find(|t| match bcrypt::verify(&secret, &t.secret_hash) {
        Ok(ok) => ok,
        Err(e) => {
          warn!(token_id = %t.id, error = %e, "Stored refresh hash is malformed");
          false
        }
      })
    })
    .await
    .map_err(|e| ServiceError::internal(format!("hash comparison task failed: {e}")))?;

    matched.ok_or_else(|| ServiceError::unauthorized("invalid refresh token"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::adapters::memory::MemoryTokenStore;
  use crate::domain::ErrorKind;

  fn settings() -> TokenSettings {
    TokenSettings {
      bcrypt_cost: 4,
      ..TokenSettings::default()
    }
  }

  fn user() -> User {
    User {
      id: Uuid::new_v4(),
      kind: "user".into(),
      name: "Ada".into(),
      email: "ada@example.com".into(),
      verified: true,
      photo: "https://img/ada.png".into(),
      provider: AuthProvider::Credentials,
    }
  }

  fn service() -> TokenService {
    TokenService::new(Arc::new(MemoryTokenStore::new()), "test-secret", settings())
  }

  #[tokio::test]
  async fn test_refresh_secret_is_base64url_256_bits() {
    let svc = service();
    let secret = svc.issue_refresh_token(Uuid::new_v4()).await.unwrap();
    assert_eq!(secret.len(), 43);
    assert_eq!(URL_SAFE_NO_PAD.decode(&secret).unwrap().len(), 32);
  }

  #[tokio::test]
  async fn test_access_token_round_trips_identity() {
    let svc = service();
    let u = user();
    let secret = svc.issue_refresh_token(u.id).await.unwrap();
    let token = svc.issue_access_token(&u, &secret).await.unwrap();
    assert_eq!(svc.verify_access_token(&token).unwrap(), u.identity());
  }

  #[tokio::test]
  async fn test_wrong_secret_unauthorized() {
    let svc = service();
    let u = user();
    svc.issue_refresh_token(u.id).await.unwrap();
    let err = svc.issue_access_token(&u, "not-the-secret").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
  }

  #[tokio::test]
  async fn test_no_tokens_unauthorized() {
    let err = service().issue_access_token(&user(), "x").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
  }

  #[tokio::test]
  async fn test_revoked_token_cannot_issue() {
    let svc = service();
    let u = user();
    let secret = svc.issue_refresh_token(u.id).await.unwrap();
    svc.revoke(u.id, &secret).await.unwrap();
    let err = svc.issue_access_token(&u, &secret).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
    let err = svc.revoke(u.id, &secret).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
  }

  #[tokio::test]
  async fn test_revoke_leaves_other_sessions() {
    let svc = service();
    let u = user();
    let phone = svc.issue_refresh_token(u.id).await.unwrap();
    let laptop = svc.issue_refresh_token(u.id).await.unwrap();
    svc.revoke(u.id, &phone).await.unwrap();
    assert!(svc.issue_access_token(&u, &laptop).await.is_ok());
  }

  #[tokio::test]
  async fn test_secret_bound_to_its_user() {
    let svc = service();
    let alice = user();
    let bob = user();
    let secret = svc.issue_refresh_token(alice.id).await.unwrap();
    svc.issue_refresh_token(bob.id).await.unwrap();
    assert!(svc.issue_access_token(&bob, &secret).await.is_err());
  }

  #[test]
  fn test_tampered_or_foreign_tokens_rejected() {
    let svc = service();
    let other = TokenService::new(Arc::new(MemoryTokenStore::new()), "other-secret", settings());
    let token = other.sign(&user().identity()).unwrap();
    assert_eq!(
      svc.verify_access_token(&token).unwrap_err().kind,
      ErrorKind::Unauthorized
    );
    assert!(svc.verify_access_token("garbage").is_err());
  }

  #[test]
  fn test_expired_access_token_rejected() {
    let store = Arc::new(MemoryTokenStore::new());
    let expired = TokenService::new(
      store,
      "test-secret",
      TokenSettings {
        access_ttl: Duration::seconds(-5),
        ..settings()
      },
    );
    let token = expired.sign(&user().identity()).unwrap();
    assert!(expired.verify_access_token(&token).is_err());
  }
}
