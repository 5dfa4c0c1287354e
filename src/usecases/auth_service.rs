//! Auth Service - Account Flows
//!
//! Composes the user repository with the token and OTP services:
//! credential sign-up/sign-in, sign-out, access token refresh, email
//! verification and OAuth sign-in. Every flow that creates a session
//! issues a refresh token first and then signs the access token against
//! it, the same path a later refresh takes.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::identity::{
  AuthProvider, Identity, NewCredentialUser, OAuthProfile, User,
};
use crate::domain::{ServiceError, StoreError};
use crate::ports::repository::UserRepository;
use crate::usecases::otp_service::OtpService;
use crate::usecases::token_service::TokenService;

/// A freshly created session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
  pub user: User,
  #[serde(skip)]
  pub access_token: String,
  #[serde(skip)]
  pub refresh_token: String,
}

pub struct AuthService {
  users: Arc<dyn UserRepository>,
  tokens: Arc<TokenService>,
  otp: Arc<OtpService>,
  bcrypt_cost: u32,
}

fn require(field: &str, value: &str) -> Result<(), ServiceError> {
  if value.trim().is_empty() {
    return Err(ServiceError::bad_request(format!("{field} is required")));
  }
  Ok(())
}

impl AuthService {
  pub fn new(
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenService>,
    otp: Arc<OtpService>,
    bcrypt_cost: u32,
  ) -> Self {
    Self {
      users,
      tokens,
      otp,
      bcrypt_cost,
    }
  }

  pub fn tokens(&self) -> &Arc<TokenService> {
    &self.tokens
  }

  /// Register a credentials user with an empty wallet.
  #[instrument(skip(self, name, password))]
  pub async fn sign_up(&self, email: &str, name: &str, password: &str) -> Result<Session, ServiceError> {
    require("email", email)?;
    require("name", name)?;
    require("password", password)?;

    let cost = self.bcrypt_cost;
    let plain = password.to_string();
    let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
      .await
      .map_err(|e| ServiceError::internal(format!("hashing task failed: {e}")))?
      .map_err(|e| ServiceError::internal(format!("unable to hash password: {e}")))?;

    let user = self
      .users
      .create_with_wallet(&NewCredentialUser {
        email: email.to_string(),
        name: name.to_string(),
        password_hash,
      })
      .await
      .map_err(|e| match e {
        StoreError::Conflict(_) => ServiceError::conflict("an account with this email already exists"),
        other => other.into(),
      })?;

    info!(user_id = %user.id, "User registered");
    self.open_session(user).await
  }

  /// Sign in with email and password.
  #[instrument(skip(self, password))]
  pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ServiceError> {
    require("email", email)?;
    require("password", password)?;

    let found = self
      .users
      .find_by_email(email, AuthProvider::Credentials)
      .await
      .map_err(|e| match e {
        StoreError::NotFound => ServiceError::not_found("no account with this email"),
        other => other.into(),
      })?;

    let Some(hash) = found.password_hash else {
      return Err(ServiceError::bad_request("this account has no password, use its sign-in provider"));
    };
    let plain = password.to_string();
    let matches = tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash))
      .await
      .map_err(|e| ServiceError::internal(format!("hash comparison task failed: {e}")))?
      .unwrap_or(false);
    if !matches {
      warn!(user_id = %found.user.id, "Wrong password");
      return Err(ServiceError::bad_request("wrong password"));
    }

    self.open_session(found.user).await
  }

  /// Revoke the presented refresh token.
  pub async fn sign_out(&self, user_id: Uuid, refresh_secret: &str) -> Result<(), ServiceError> {
    self.tokens.revoke(user_id, refresh_secret).await
  }

  /// Sign a new access token from the latest user row.
  #[instrument(skip(self, refresh_secret))]
  pub async fn refresh(&self, user_id: Uuid, refresh_secret: &str) -> Result<String, ServiceError> {
    let user = self.users.find_by_id(user_id).await.map_err(|e| match e {
      StoreError::NotFound => ServiceError::unauthorized("unknown user"),
      other => other.into(),
    })?;
    self.tokens.issue_access_token(&user, refresh_secret).await
  }

  /// Mail a verification code to the caller.
  pub async fn send_otp(&self, identity: &Identity) -> Result<(), ServiceError> {
    self
      .otp
      .send(&identity.id.to_string(), &identity.name, &identity.email)
      .await
  }

  /// Consume the caller's code and mark the account verified.
  ///
  /// The code is consumed first. If marking the account then fails, the
  /// code stays spent and the caller must request a new one, so a code
  /// never verifies twice.
  ///
  /// The caller's current access token still carries `verified = false`
  /// until it is refreshed.
  #[instrument(skip(self, identity, code), fields(user_id = %identity.id))]
  pub async fn verify_otp(&self, identity: &Identity, code: &str) -> Result<(), ServiceError> {
    require("otp", code)?;
    self.otp.verify(&identity.id.to_string(), code).await?;
    self.users.mark_verified(identity.id).await?;
    info!("User verified");
    Ok(())
  }

  /// Sign in (or register) a user returned by an OAuth provider.
  #[instrument(skip(self, profile), fields(provider = %profile.provider))]
  pub async fn oauth_sign_in(&self, profile: &OAuthProfile) -> Result<Session, ServiceError> {
    require("email", &profile.email)?;
    if profile.provider == AuthProvider::Credentials {
      return Err(ServiceError::bad_request("credentials is not an OAuth provider"));
    }
    let user = self.users.upsert_oauth_with_wallet(profile).await?;
    self.open_session(user).await
  }

  async fn open_session(&self, user: User) -> Result<Session, ServiceError> {
    let refresh_token = self.tokens.issue_refresh_token(user.id).await?;
    let access_token = self.tokens.issue_access_token(&user, &refresh_token).await?;
    Ok(Session {
      user,
      access_token,
      refresh_token,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::adapters::memory::{MemoryOtpStore, MemoryTokenStore, MemoryUserStore};
  use crate::domain::ErrorKind;
  use crate::ports::mail::{MailDispatcher, OutboundMail};
  use crate::usecases::token_service::TokenSettings;
  use async_trait::async_trait;
  use std::time::Duration;
  use tokio::sync::Mutex;

  #[derive(Default)]
  struct Outbox(Mutex<Vec<OutboundMail>>);

  #[async_trait]
  impl MailDispatcher for Outbox {
    async fn send(&self, mail: &OutboundMail) -> anyhow::Result<()> {
      self.0.lock().await.push(mail.clone());
      Ok(())
    }
  }

  struct Fixture {
    auth: AuthService,
    otp: Arc<OtpService>,
    users: Arc<MemoryUserStore>,
  }

  fn fixture() -> Fixture {
    let users = Arc::new(MemoryUserStore::new());
    let tokens = Arc::new(TokenService::new(
      Arc::new(MemoryTokenStore::new()),
      "test-secret",
      TokenSettings {
        bcrypt_cost: 4,
        ..TokenSettings::default()
      },
    ));
    let otp = Arc::new(OtpService::new(
      Arc::new(MemoryOtpStore::new()),
      Arc::new(Outbox::default()),
      Duration::from_secs(300),
      "Verify",
    ));
    let auth = AuthService::new(users.clone(), tokens, Arc::clone(&otp), 4);
    Fixture { auth, otp, users }
  }

  #[tokio::test]
  async fn test_sign_up_then_sign_in() {
    let f = fixture();
    let session = f.auth.sign_up("a@x.io", "Ada", "hunter22").await.unwrap();
    assert!(!session.user.verified);
    assert_eq!(f.users.wallet_count().await, 1);

    let again = f.auth.sign_in("a@x.io", "hunter22").await.unwrap();
    assert_eq!(again.user.id, session.user.id);
    let id = f.auth.tokens().verify_access_token(&again.access_token).unwrap();
    assert_eq!(id.email, "a@x.io");
  }

  #[tokio::test]
  async fn test_duplicate_sign_up_conflicts() {
    let f = fixture();
    f.auth.sign_up("a@x.io", "Ada", "pw").await.unwrap();
    let err = f.auth.sign_up("a@x.io", "Ada", "pw").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
  }

  #[tokio::test]
  async fn test_sign_in_errors() {
    let f = fixture();
    assert_eq!(
      f.auth.sign_in("nobody@x.io", "pw").await.unwrap_err().kind,
      ErrorKind::NotFound
    );
    f.auth.sign_up("a@x.io", "Ada", "pw").await.unwrap();
    assert_eq!(
      f.auth.sign_in("a@x.io", "wrong").await.unwrap_err().kind,
      ErrorKind::BadRequest
    );
    assert_eq!(f.auth.sign_in("", "pw").await.unwrap_err().kind, ErrorKind::BadRequest);
  }

  #[tokio::test]
  async fn test_sign_out_blocks_refresh() {
    let f = fixture();
    let s = f.auth.sign_up("a@x.io", "Ada", "pw").await.unwrap();
    assert!(f.auth.refresh(s.user.id, &s.refresh_token).await.is_ok());
    f.auth.sign_out(s.user.id, &s.refresh_token).await.unwrap();
    assert_eq!(
      f.auth.refresh(s.user.id, &s.refresh_token).await.unwrap_err().kind,
      ErrorKind::Unauthorized
    );
  }

  #[tokio::test]
  async fn test_verify_otp_marks_user_and_refresh_reflects_it() {
    let f = fixture();
    let s = f.auth.sign_up("a@x.io", "Ada", "pw").await.unwrap();
    let identity = s.user.identity();
    f.auth.send_otp(&identity).await.unwrap();
    let code = f.otp.generate(&identity.id.to_string()).await.unwrap();
    f.auth.verify_otp(&identity, &code).await.unwrap();

    let token = f.auth.refresh(s.user.id, &s.refresh_token).await.unwrap();
    assert!(f.auth.tokens().verify_access_token(&token).unwrap().verified);
  }

  #[tokio::test]
  async fn test_oauth_sign_in_is_verified_and_idempotent() {
    let f = fixture();
    let profile = OAuthProfile {
      email: "a@x.io".into(),
      name: "Ada".into(),
      photo: String::new(),
      provider: AuthProvider::Google,
    };
    let first = f.auth.oauth_sign_in(&profile).await.unwrap();
    let second = f.auth.oauth_sign_in(&profile).await.unwrap();
    assert!(first.user.verified);
    assert_eq!(first.user.id, second.user.id);
    assert_eq!(f.users.wallet_count().await, 1);
  }
}
