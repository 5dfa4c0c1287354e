//! Mail Port - Outbound Email Dispatch

use async_trait::async_trait;
use serde::Serialize;

/// JSON payload accepted by the mail server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMail {
  pub email: String,
  pub subject: String,
  pub body: String,
}

#[async_trait]
pub trait MailDispatcher: Send + Sync + 'static {
  /// Hand a message to the mail server. Any status >= 400 is an error.
  async fn send(&self, mail: &OutboundMail) -> anyhow::Result<()>;
}
