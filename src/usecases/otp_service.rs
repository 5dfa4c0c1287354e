//! OTP Service - Single-Use Email Verification Codes
//!
//! At most one active code per subject. Regenerating while a code is
//! live extends that code's expiry instead of minting a new one, so a
//! mail that arrives late still carries a valid code.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::adapters::metrics::MetricsRegistry;
use crate::domain::otp::{otp_key, random_code, verification_mail_body};
use crate::domain::ServiceError;
use crate::ports::mail::{MailDispatcher, OutboundMail};
use crate::ports::otp_store::OtpStore;

pub struct OtpService {
  store: Arc<dyn OtpStore>,
  mailer: Arc<dyn MailDispatcher>,
  ttl: Duration,
  mail_subject: String,
  metrics: Option<Arc<MetricsRegistry>>,
}

impl OtpService {
  pub fn new(
    store: Arc<dyn OtpStore>,
    mailer: Arc<dyn MailDispatcher>,
    ttl: Duration,
    mail_subject: impl Into<String>,
  ) -> Self {
    Self {
      store,
      mailer,
      ttl,
      mail_subject: mail_subject.into(),
      metrics: None,
    }
  }

  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  /// Return the subject's active code with a refreshed expiry, or store
  /// a fresh one.
  #[instrument(skip(self))]
  pub async fn generate(&self, subject: &str) -> Result<String, ServiceError> {
    let key = otp_key(subject);

    if let Some(existing) = self.store.get(&key).await? {
      // The key can expire between GET and EXPIRE; fall through to a
      // fresh code in that case.
      if self.store.touch(&key, self.ttl).await? {
        info!("Extended active OTP");
        return Ok(existing);
      }
    }

    let code = random_code();
    self.store.put(&key, &code, self.ttl).await?;
    info!("Issued new OTP");
    Ok(code)
  }

  /// Consume the subject's code if `code` matches.
  ///
  /// A mismatch leaves the active code in place.
  #[instrument(skip(self, code))]
  pub async fn verify(&self, subject: &str, code: &str) -> Result<(), ServiceError> {
    let key = otp_key(subject);

    let Some(active) = self.store.get(&key).await? else {
      self.record("missing");
      return Err(ServiceError::not_found("no active OTP, request a new one"));
    };

    if active != code {
      self.record("mismatch");
      warn!("OTP mismatch");
      return Err(ServiceError::unprocessable("invalid OTP"));
    }

    // A concurrent verify may already have consumed it.
    if !self.store.remove(&key).await? {
      self.record("missing");
      return Err(ServiceError::not_found("no active OTP, request a new one"));
    }

    self.record("ok");
    info!("OTP verified");
    Ok(())
  }

  /// Generate (or extend) a code and mail it to `email`.
  #[instrument(skip(self, name, email))]
  pub async fn send(&self, subject: &str, name: &str, email: &str) -> Result<(), ServiceError> {
    let code = self.generate(subject).await?;
    let mail = OutboundMail {
      email: email.to_string(),
      subject: self.mail_subject.clone(),
      body: verification_mail_body(name, &code, self.ttl.as_secs() / 60),
    };
    self.mailer.send(&mail).await.map_err(|e| {
      warn!(error = %format!("{e:#}"), "Mail dispatch failed");
      ServiceError::internal("unable to send verification mail, retry later")
    })
  }

  fn record(&self, outcome: &str) {
    if let Some(m) = &self.metrics {
      m.otp_verifications.with_label_values(&[outcome]).inc();
    }
  }
}
