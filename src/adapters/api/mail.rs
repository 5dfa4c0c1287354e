//! Mail Server Client - JSON POST to the mail service

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, instrument};

use crate::ports::mail::{MailDispatcher, OutboundMail};

pub struct HttpMailer {
  http: Client,
  url: String,
}

impl HttpMailer {
  pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
    let http = Client::builder()
      .timeout(timeout)
      .build()
      .context("Failed to build HTTP client")?;
    Ok(Self {
      http,
      url: url.into(),
    })
  }
}

#[async_trait]
impl MailDispatcher for HttpMailer {
  #[instrument(skip(self, mail), fields(url = %self.url))]
  async fn send(&self, mail: &OutboundMail) -> Result<()> {
    let response = self
      .http
      .post(&self.url)
      .json(mail)
      .send()
      .await
      .context("Mail server unreachable")?;

    let status = response.status();
    if status.as_u16() >= 400 {
      let body = response.text().await.unwrap_or_default();
      anyhow::bail!("mail server returned {status}: {body}");
    }
    info!(%status, "Mail accepted");
    Ok(())
  }
}
