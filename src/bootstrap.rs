//! Wiring - Backends and Services
//!
//! Builds the adapter set selected by `storage.backend` and the use
//! cases on top of it. Shared by both binaries and the integration
//! tests so that every entry point runs the same graph.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::adapters::http::AppState;
use crate::adapters::memory::{
    MemoryCatalog, MemoryOrderLog, MemoryOtpStore, MemoryTokenStore, MemoryUserStore,
};
use crate::adapters::metrics::MetricsRegistry;
use crate::adapters::persistence::PgStore;
use crate::adapters::redis_store::{self, RedisOrderLog, RedisOtpStore};
use crate::config::{AppConfig, LoggingConfig, Secrets, StorageBackend, StorageConfig};
use crate::ports::mail::MailDispatcher;
use crate::ports::{
    FootballMetaRepository, MarketRepository, OrderLog, OtpStore, TokenStore, UserRepository,
    WalletRepository,
};
use crate::usecases::{
    AuthService, FootballMetaService, MarketService, OrderIntake, OtpService, TokenService,
    TokenSettings, WalletService,
};

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// One handle per port.
#[derive(Clone)]
pub struct Backends {
    pub tokens: Arc<dyn TokenStore>,
    pub otp: Arc<dyn OtpStore>,
    pub orders: Arc<dyn OrderLog>,
    pub users: Arc<dyn UserRepository>,
    pub wallets: Arc<dyn WalletRepository>,
    pub markets: Arc<dyn MarketRepository>,
    pub football: Arc<dyn FootballMetaRepository>,
    /// Metrics label of the order log backend.
    pub label: &'static str,
}

impl Backends {
    /// Process-local stores. Nothing survives a restart.
    pub fn in_memory() -> Self {
        let users = Arc::new(MemoryUserStore::new());
        let catalog = Arc::new(MemoryCatalog::new());
        Self {
            tokens: Arc::new(MemoryTokenStore::new()),
            otp: Arc::new(MemoryOtpStore::new()),
            orders: Arc::new(MemoryOrderLog::new()),
            users: users.clone(),
            wallets: users,
            markets: catalog.clone(),
            football: catalog,
            label: "memory",
        }
    }

    /// Open the configured backend.
    pub async fn connect(storage: &StorageConfig) -> Result<Self> {
        match storage.backend {
            StorageBackend::Memory => {
                info!("Using in-memory storage");
                Ok(Self::in_memory())
            }
            StorageBackend::Postgres => {
                let pg = Arc::new(
                    PgStore::connect(&storage.database_url, storage.max_connections).await?,
                );
                let redis = redis_store::connect(&storage.redis_url).await?;
                Ok(Self {
                    tokens: pg.clone(),
                    otp: Arc::new(RedisOtpStore::new(redis.clone())),
                    orders: Arc::new(RedisOrderLog::new(redis)),
                    users: pg.clone(),
                    wallets: pg.clone(),
                    markets: pg.clone(),
                    football: pg,
                    label: "redis",
                })
            }
        }
    }
}

/// The request-facing use cases.
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<AuthService>,
    pub tokens: Arc<TokenService>,
    pub otp: Arc<OtpService>,
    pub orders: Arc<OrderIntake>,
    pub markets: Arc<MarketService>,
    pub wallets: Arc<WalletService>,
    pub football: Arc<FootballMetaService>,
}

impl Services {
    pub fn build(
        config: &AppConfig,
        secrets: &Secrets,
        backends: &Backends,
        mailer: Arc<dyn MailDispatcher>,
        metrics: Option<Arc<MetricsRegistry>>,
    ) -> Result<Self> {
        let access_ttl = i64::try_from(config.auth.access_token_ttl_seconds)
            .context("auth.access_token_ttl_seconds out of range")?;
        let settings = TokenSettings {
            access_ttl: chrono::Duration::seconds(access_ttl),
            refresh_ttl: chrono::Duration::days(config.auth.refresh_token_ttl_days),
            bcrypt_cost: config.auth.bcrypt_cost,
        };

        let mut tokens = TokenService::new(backends.tokens.clone(), &secrets.auth_secret, settings);
        let mut otp = OtpService::new(
            backends.otp.clone(),
            mailer,
            Duration::from_secs(config.otp.ttl_seconds),
            config.mail.verification_subject.clone(),
        );
        let mut orders = OrderIntake::new(backends.orders.clone(), config.orders.stream_prefix.clone());
        if let Some(m) = &metrics {
            tokens = tokens.with_metrics(m.clone());
            otp = otp.with_metrics(m.clone());
            orders = orders.with_metrics(m.clone(), backends.label);
        }

        let tokens = Arc::new(tokens);
        let otp = Arc::new(otp);
        let auth = Arc::new(AuthService::new(
            backends.users.clone(),
            tokens.clone(),
            otp.clone(),
            config.auth.bcrypt_cost,
        ));

        Ok(Self {
            auth,
            tokens,
            otp,
            orders: Arc::new(orders),
            markets: Arc::new(MarketService::new(backends.markets.clone())),
            wallets: Arc::new(WalletService::new(backends.wallets.clone())),
            football: Arc::new(FootballMetaService::new(backends.football.clone())),
        })
    }

    /// Shared state for the HTTP router.
    pub fn app_state(&self, cookie_secure: bool) -> AppState {
        AppState {
            auth: self.auth.clone(),
            tokens: self.tokens.clone(),
            orders: self.orders.clone(),
            markets: self.markets.clone(),
            wallets: self.wallets.clone(),
            football: self.football.clone(),
            cookie_secure,
        }
    }
}
