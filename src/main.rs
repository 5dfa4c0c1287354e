//! Rivon Core - API Entry Point
//!
//! Serves the public API and the probe/metrics endpoints until SIGINT.
//!
//! Wiring sequence:
//! 1. Load .env, then config.toml (path overridable with RIVON_CONFIG) + validate
//! 2. Init tracing (JSON or plain, EnvFilter)
//! 3. Load secrets (AUTH_SECRET)
//! 4. Open the configured storage backend
//! 5. Build services (tokens, OTP, auth, order intake, markets, wallets)
//! 6. Spawn health/metrics server and API server
//! 7. Wait for SIGINT → drain (readiness 503) → stop servers

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use rivon_core::adapters::api::HttpMailer;
use rivon_core::adapters::http::ApiServer;
use rivon_core::adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use rivon_core::bootstrap::{self, Backends, Services};
use rivon_core::config;

/// Upper bound on in-flight request draining at shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Mail server request timeout.
const MAIL_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Configuration ────────────────────────────────────
    dotenv::dotenv().ok();
    let config_path = std::env::var("RIVON_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = config::loader::load_config(&config_path).context("Failed to load configuration")?;

    // ── 2. Logging ──────────────────────────────────────────
    bootstrap::init_tracing(&config.logging);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = ?config.storage.backend,
        "Starting Rivon core"
    );

    // ── 3. Secrets ──────────────────────────────────────────
    let secrets = config::loader::load_secrets().context("Failed to load secrets from env")?;

    // ── 4. Storage ──────────────────────────────────────────
    let backends = Backends::connect(&config.storage).await?;

    // ── 5. Services ─────────────────────────────────────────
    let metrics = if config.metrics.enabled {
        Some(Arc::new(MetricsRegistry::new()?))
    } else {
        None
    };
    let mailer = Arc::new(HttpMailer::new(config.mail.server_url.clone(), MAIL_TIMEOUT)?);
    let services = Services::build(&config, &secrets, &backends, mailer, metrics.clone())?;

    // ── 6. Servers ──────────────────────────────────────────
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let health = HealthState::new();

    let health_server = HealthServer::new(health.clone(), metrics, config.metrics.bind_address.clone());
    let health_shutdown = shutdown_tx.subscribe();
    let health_handle = tokio::spawn(async move {
        if let Err(e) = health_server.run(health_shutdown).await {
            error!(error = %e, "Health server failed");
        }
    });

    let api = ApiServer::new(services.app_state(config.server.cookie_secure), &config.server)?;
    let api_shutdown = shutdown_tx.subscribe();
    let mut api_handle = tokio::spawn(async move { api.run(api_shutdown).await });

    // ── 7. Wait for SIGINT or an early server exit ──────────
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("SIGINT received, initiating graceful shutdown");
        }
        res = &mut api_handle => {
            match res {
                Ok(Ok(())) => warn!("API server exited"),
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
            }
            health.set_draining();
            let _ = shutdown_tx.send(());
            let _ = tokio::time::timeout(Duration::from_secs(5), health_handle).await;
            anyhow::bail!("API server stopped unexpectedly");
        }
    }

    // Readiness goes 503 before the servers stop.
    health.set_draining();
    let _ = shutdown_tx.send(());

    if tokio::time::timeout(DRAIN_TIMEOUT, api_handle).await.is_err() {
        warn!("In-flight requests did not drain in time");
    }
    let _ = tokio::time::timeout(Duration::from_secs(5), health_handle).await;

    info!("Shutdown complete");
    Ok(())
}
