//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! reading secrets from the environment and the static football
//! competitions file.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::{AppConfig, Secrets, StorageBackend};
use crate::domain::football::StaticCompetitions;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    backend = ?config.storage.backend,
    bind = %config.server.bind_address,
    stream_prefix = %config.orders.stream_prefix,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content)
    .with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
  // Storage
  if config.storage.backend == StorageBackend::Postgres {
    anyhow::ensure!(
      !config.storage.database_url.is_empty(),
      "storage.database_url is required for the postgres backend"
    );
    anyhow::ensure!(
      !config.storage.redis_url.is_empty(),
      "storage.redis_url is required for the postgres backend"
    );
  }
  anyhow::ensure!(
    config.storage.max_connections > 0,
    "storage.max_connections must be positive"
  );

  // Auth
  anyhow::ensure!(
    config.auth.access_token_ttl_seconds > 0,
    "auth.access_token_ttl_seconds must be positive"
  );
  anyhow::ensure!(
    config.auth.refresh_token_ttl_days > 0,
    "auth.refresh_token_ttl_days must be positive, got {}",
    config.auth.refresh_token_ttl_days
  );
  anyhow::ensure!(
    (4..=31).contains(&config.auth.bcrypt_cost),
    "auth.bcrypt_cost must be in [4, 31], got {}",
    config.auth.bcrypt_cost
  );

  // OTP
  anyhow::ensure!(config.otp.ttl_seconds > 0, "otp.ttl_seconds must be positive");

  // Orders
  anyhow::ensure!(
    !config.orders.stream_prefix.is_empty(),
    "orders.stream_prefix must not be empty"
  );

  // Server
  anyhow::ensure!(
    config.server.request_timeout_seconds > 0,
    "server.request_timeout_seconds must be positive"
  );
  let origin = &config.server.client_base_url;
  anyhow::ensure!(
    (origin.starts_with("http://") || origin.starts_with("https://"))
      && !origin.chars().any(|c| c.is_whitespace() || c.is_control()),
    "server.client_base_url must be an http(s) origin, got {origin:?}"
  );

  // Mail
  anyhow::ensure!(
    config.mail.server_url.starts_with("http://")
      || config.mail.server_url.starts_with("https://"),
    "mail.server_url must be an http(s) URL, got {:?}",
    config.mail.server_url
  );

  Ok(())
}

/// Read secrets from the process environment.
pub fn load_secrets() -> Result<Secrets> {
  secrets_from(|key| std::env::var(key).ok())
}

/// Build secrets from any key lookup.
///
/// `AUTH_SECRET` is required. Football keys are read as
/// `FOOTBALL_API_KEY_1`, `FOOTBALL_API_KEY_2`, ... up to the first gap.
pub fn secrets_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Secrets> {
  let auth_secret = lookup("AUTH_SECRET")
    .map(|s| s.trim().to_string())
    .filter(|s| !s.is_empty())
    .context("Missing or empty env var AUTH_SECRET")?;

  let football_api_keys = (1..)
    .map_while(|i| {
      lookup(&format!("FOOTBALL_API_KEY_{i}"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    })
    .collect();

  Ok(Secrets {
    auth_secret,
    football_api_keys,
  })
}

/// Read the static competitions JSON seeded at startup.
pub fn load_static_competitions(path: &str) -> Result<StaticCompetitions> {
  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read static competitions file: {path}"))?;
  serde_json::from_str(&content)
    .with_context(|| format!("Invalid static competitions JSON in {path}"))
}
