//! Rivon Jobs - League Stats Cron
//!
//! Seeds countries and competitions from the static JSON file, syncs
//! standings and markets once at start, then again at every UTC
//! midnight until SIGINT. A failed run is logged and retried at the
//! next tick.

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveTime, Utc};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};

use rivon_core::adapters::api::{FootballClientConfig, FootballDataClient};
use rivon_core::adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use rivon_core::bootstrap::{self, Backends};
use rivon_core::config;
use rivon_core::usecases::LeagueStats;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let config_path = std::env::var("RIVON_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = config::loader::load_config(&config_path).context("Failed to load configuration")?;
    bootstrap::init_tracing(&config.logging);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting Rivon jobs");

    let secrets = config::loader::load_secrets().context("Failed to load secrets from env")?;
    let statics = config::loader::load_static_competitions(&config.football.static_competitions_file)?;
    let backends = Backends::connect(&config.storage).await?;

    let provider = Arc::new(FootballDataClient::new(FootballClientConfig {
        base_url: config.football.api_base_url.clone(),
        timeout: Duration::from_secs(config.football.timeout_seconds),
        api_keys: secrets.football_api_keys.clone(),
    })?);

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let mut stats = LeagueStats::new(backends.football.clone(), backends.markets.clone(), provider);
    let mut health_handle = None;
    if config.metrics.enabled {
        let registry = Arc::new(MetricsRegistry::new()?);
        stats = stats.with_metrics(registry.clone());
        let server = HealthServer::new(
            HealthState::new(),
            Some(registry),
            config.metrics.jobs_bind_address.clone(),
        );
        let rx = shutdown_tx.subscribe();
        health_handle = Some(tokio::spawn(async move {
            if let Err(e) = server.run(rx).await {
                error!(error = %e, "Health server failed");
            }
        }));
    }

    stats.seed(&statics).await?;

    loop {
        match stats.sync().await {
            Ok(report) => info!(leagues = report.leagues, teams = report.teams, "Sync complete"),
            Err(e) => error!(error = %format!("{e:#}"), "Sync failed"),
        }

        let wait = until_next_midnight(Utc::now());
        info!(wait_secs = wait.as_secs(), "Next sync at UTC midnight");
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("SIGINT received, stopping jobs");
                break;
            }
            () = tokio::time::sleep(wait) => {}
        }
    }

    let _ = shutdown_tx.send(());
    if let Some(handle) = health_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }
    Ok(())
}

/// Time left until the next 00:00 UTC strictly after `now`.
fn until_next_midnight(now: DateTime<Utc>) -> Duration {
    now.date_naive()
        .succ_opt()
        .map(|day| day.and_time(NaiveTime::MIN).and_utc())
        .and_then(|next| (next - now).to_std().ok())
        .unwrap_or(Duration::from_secs(24 * 60 * 60))
}
