//! football-data.org Client - Keyed REST Client with Key Rotation
//!
//! Wraps reqwest with the `X-Auth-Token` header. A 429 on one key is
//! retried immediately with each of the other configured keys; any other
//! failure is returned as is.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, warn};

use crate::domain::football::StandingsResponse;
use crate::ports::standings::StandingsProvider;

/// Configuration for the football-data.org client.
#[derive(Debug, Clone)]
pub struct FootballClientConfig {
  /// Base URL, without trailing slash.
  pub base_url: String,
  /// Request timeout.
  pub timeout: Duration,
  /// API keys in rotation order.
  pub api_keys: Vec<String>,
}

pub struct FootballDataClient {
  http: Client,
  config: FootballClientConfig,
}

impl FootballDataClient {
  pub fn new(config: FootballClientConfig) -> Result<Self> {
    anyhow::ensure!(
      !config.api_keys.is_empty(),
      "At least one FOOTBALL_API_KEY_n must be set"
    );
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(5)
      .build()
      .context("Failed to build HTTP client")?;
    Ok(Self { http, config })
  }

  /// GET `path` and decode JSON, rotating keys on 429.
  async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
    let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);

    for (slot, key) in self.config.api_keys.iter().enumerate() {
      let response = self
        .http
        .get(&url)
        .header("X-Auth-Token", key)
        .send()
        .await
        .with_context(|| format!("GET {url} failed"))?;

      match response.status() {
        StatusCode::TOO_MANY_REQUESTS => {
          warn!(slot, "football-data.org rate limited this key, rotating");
          continue;
        }
        status if status.is_success() => {
          debug!(slot, %status, "football-data.org response");
          return response
            .json::<T>()
            .await
            .with_context(|| format!("Invalid JSON from {url}"));
        }
        status => {
          let body = response.text().await.unwrap_or_default();
          anyhow::bail!("football-data.org error {status}: {body}");
        }
      }
    }

    anyhow::bail!(
      "football-data.org rate limited all {} keys",
      self.config.api_keys.len()
    )
  }
}

#[async_trait]
impl StandingsProvider for FootballDataClient {
  #[instrument(skip(self))]
  async fn standings(&self, league_id: i64) -> Result<StandingsResponse> {
    self
      .get_json(&format!("/v4/competitions/{league_id}/standings"))
      .await
  }
}
