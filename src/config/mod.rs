//! Configuration Module - TOML-based Service Configuration
//!
//! Loads and validates configuration from `config.toml`. Secrets never
//! live in the file: `AUTH_SECRET` and the football-data.org keys come
//! from the environment (optionally via a `.env` file).

pub mod loader;

use serde::Deserialize;

/// Top-level service configuration.
///
/// Loaded from `config.toml` at startup and validated before any
/// backend connection is opened.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// HTTP API server.
  pub server: ServerConfig,
  /// Storage backend selection and connection strings.
  pub storage: StorageConfig,
  /// Token lifetimes and hashing cost.
  #[serde(default)]
  pub auth: AuthConfig,
  /// One-time code settings.
  #[serde(default)]
  pub otp: OtpConfig,
  /// Order intake settings.
  #[serde(default)]
  pub orders: OrdersConfig,
  /// Outbound mail server.
  pub mail: MailConfig,
  /// football-data.org ingestion.
  pub football: FootballConfig,
  /// Log output.
  #[serde(default)]
  pub logging: LoggingConfig,
  /// Metrics and health probes.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  /// API bind address.
  #[serde(default = "default_bind_address")]
  pub bind_address: String,
  /// Set the `Secure` attribute on session cookies.
  #[serde(default)]
  pub cookie_secure: bool,
  /// Front-end origin. The only origin CORS admits, with credentials.
  pub client_base_url: String,
  /// Per-request ceiling in seconds.
  #[serde(default = "default_request_timeout")]
  pub request_timeout_seconds: u64,
}

/// Which adapter set backs the ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
  /// In-process maps. Nothing survives a restart.
  Memory,
  /// PostgreSQL for relational state, Redis for OTPs and order streams.
  Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
  pub backend: StorageBackend,
  #[serde(default)]
  pub database_url: String,
  #[serde(default)]
  pub redis_url: String,
  #[serde(default = "default_max_connections")]
  pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
  /// Access token lifetime (seconds).
  #[serde(default = "default_access_ttl")]
  pub access_token_ttl_seconds: u64,
  /// Refresh token lifetime (days).
  #[serde(default = "default_refresh_ttl_days")]
  pub refresh_token_ttl_days: i64,
  /// bcrypt work factor for passwords and refresh secrets.
  #[serde(default = "default_bcrypt_cost")]
  pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
  fn default() -> Self {
    Self {
      access_token_ttl_seconds: default_access_ttl(),
      refresh_token_ttl_days: default_refresh_ttl_days(),
      bcrypt_cost: default_bcrypt_cost(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtpConfig {
  #[serde(default = "default_otp_ttl")]
  pub ttl_seconds: u64,
}

impl Default for OtpConfig {
  fn default() -> Self {
    Self {
      ttl_seconds: default_otp_ttl(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrdersConfig {
  /// Prefix of every per-market stream key.
  #[serde(default = "default_stream_prefix")]
  pub stream_prefix: String,
}

impl Default for OrdersConfig {
  fn default() -> Self {
    Self {
      stream_prefix: default_stream_prefix(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
  /// Full URL the mail JSON is POSTed to.
  pub server_url: String,
  #[serde(default = "default_mail_subject")]
  pub verification_subject: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FootballConfig {
  #[serde(default = "default_football_base_url")]
  pub api_base_url: String,
  /// Static competitions JSON seeded at startup.
  #[serde(default = "default_static_file")]
  pub static_competitions_file: String,
  #[serde(default = "default_football_timeout")]
  pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
  /// Fallback filter when `RUST_LOG` is unset.
  #[serde(default = "default_log_level")]
  pub level: String,
  /// JSON lines instead of human-readable output.
  #[serde(default = "default_true")]
  pub json: bool,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      json: true,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Bind address of the `/metrics` + probes server.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
  /// Same endpoints for the `rivon-jobs` process.
  #[serde(default = "default_jobs_metrics_addr")]
  pub jobs_bind_address: String,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: default_metrics_addr(),
      jobs_bind_address: default_jobs_metrics_addr(),
    }
  }
}

/// Secrets read from the process environment.
#[derive(Clone)]
pub struct Secrets {
  /// HMAC key for access tokens.
  pub auth_secret: String,
  /// football-data.org keys, in rotation order.
  pub football_api_keys: Vec<String>,
}

impl std::fmt::Debug for Secrets {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Secrets")
      .field("auth_secret", &"<redacted>")
      .field("football_api_keys", &self.football_api_keys.len())
      .finish()
  }
}

// Default value functions for serde

fn default_bind_address() -> String {
  "0.0.0.0:8080".to_string()
}

fn default_request_timeout() -> u64 {
  60
}

fn default_max_connections() -> u32 {
  10
}

fn default_access_ttl() -> u64 {
  600
}

fn default_refresh_ttl_days() -> i64 {
  15
}

fn default_bcrypt_cost() -> u32 {
  bcrypt::DEFAULT_COST
}

fn default_otp_ttl() -> u64 {
  300
}

fn default_stream_prefix() -> String {
  "ORDERS_".to_string()
}

fn default_mail_subject() -> String {
  "Verify your email for Rivon".to_string()
}

fn default_football_base_url() -> String {
  "https://api.football-data.org".to_string()
}

fn default_static_file() -> String {
  "data/football_org_static.json".to_string()
}

fn default_football_timeout() -> u64 {
  10
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_jobs_metrics_addr() -> String {
  "0.0.0.0:9091".to_string()
}
