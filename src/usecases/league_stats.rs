//! League Stats - Football Metadata Seeding and Standings Sync
//!
//! `seed` loads the static competitions list once at startup.
//! `sync` runs one task per league: fetch standings, upsert the season,
//! then for every overall-table row upsert the team, its market and the
//! standings line. The batch fails fast: the first failing league
//! aborts the others.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tokio::task::JoinSet;
use tracing::{error, info, instrument};

use crate::adapters::metrics::MetricsRegistry;
use crate::domain::football::{
  League, SeasonUpsert, StandingLine, StaticCompetitions, TOTAL_STANDING, TeamUpsert,
};
use crate::domain::market::NewMarket;
use crate::ports::repository::{FootballMetaRepository, MarketRepository};
use crate::ports::standings::StandingsProvider;

/// Outcome of one successful sync batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
  pub leagues: usize,
  pub teams: usize,
}

/// Everything a per-league task needs, cheap to clone into it.
#[derive(Clone)]
struct LeagueWorker {
  meta: Arc<dyn FootballMetaRepository>,
  markets: Arc<dyn MarketRepository>,
  provider: Arc<dyn StandingsProvider>,
}

impl LeagueWorker {
  #[instrument(skip(self, league), fields(league = %league.code))]
  async fn sync_league(&self, league: League) -> Result<usize> {
    let resp = self
      .provider
      .standings(league.football_org_id)
      .await
      .with_context(|| format!("fetching standings for {}", league.code))?;

    let season = SeasonUpsert::from_response(&resp, &league)?;
    let season_id = self
      .meta
      .save_season(&season)
      .await
      .with_context(|| format!("saving season {}", season.label))?;

    let mut teams = 0;
    for standing in resp.standings.iter().filter(|s| s.kind == TOTAL_STANDING) {
      for row in &standing.table {
        let team = TeamUpsert::from_entry(row, league.id, season_id);
        let team_id = self
          .meta
          .save_team_with_league(&team)
          .await
          .with_context(|| format!("saving team {}", team.code))?;

        self
          .markets
          .upsert(&NewMarket::for_team(team_id, &team.name, &team.code))
          .await
          .with_context(|| format!("upserting market {}", team.code))?;

        let line = StandingLine::new(row, team_id, league.id, season_id)
          .with_context(|| format!("standings row for {}", team.code))?;
        self
          .meta
          .save_standings(&line)
          .await
          .with_context(|| format!("saving standings for {}", team.code))?;
        teams += 1;
      }
    }

    info!(teams, season = %season.label, "League synced");
    Ok(teams)
  }
}

pub struct LeagueStats {
  worker: LeagueWorker,
  metrics: Option<Arc<MetricsRegistry>>,
}

impl LeagueStats {
  pub fn new(
    meta: Arc<dyn FootballMetaRepository>,
    markets: Arc<dyn MarketRepository>,
    provider: Arc<dyn StandingsProvider>,
  ) -> Self {
    Self {
      worker: LeagueWorker {
        meta,
        markets,
        provider,
      },
      metrics: None,
    }
  }

  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  /// Save every country, then every competition. Idempotent.
  #[instrument(skip_all, fields(competitions = statics.competitions.len()))]
  pub async fn seed(&self, statics: &StaticCompetitions) -> Result<()> {
    let meta = &self.worker.meta;
    for league in &statics.competitions {
      meta
        .save_country(&league.country)
        .await
        .with_context(|| format!("saving country {}", league.country.name))?;
    }
    for league in &statics.competitions {
      meta
        .save_competition(league)
        .await
        .with_context(|| format!("saving competition {}", league.code))?;
    }
    info!("Football metadata seeded");
    Ok(())
  }

  /// Refresh standings and markets for every stored league.
  #[instrument(skip(self))]
  pub async fn sync(&self) -> Result<SyncReport> {
    let result = self.run_batch().await;
    if let Some(m) = &self.metrics {
      let outcome = if result.is_ok() { "ok" } else { "failed" };
      m.league_sync_runs.with_label_values(&[outcome]).inc();
    }
    result
  }

  async fn run_batch(&self) -> Result<SyncReport> {
    let leagues = self
      .worker
      .meta
      .competitions()
      .await
      .context("loading competitions")?;

    let mut report = SyncReport {
      leagues: leagues.len(),
      teams: 0,
    };
    let mut tasks = JoinSet::new();
    for league in leagues {
      let worker = self.worker.clone();
      tasks.spawn(async move { worker.sync_league(league).await });
    }

    while let Some(joined) = tasks.join_next().await {
      let failure = match joined {
        Ok(Ok(teams)) => {
          report.teams += teams;
          continue;
        }
        Ok(Err(e)) => e,
        Err(e) => anyhow!("league task aborted: {e}"),
      };
      error!(error = %format!("{failure:#}"), "League sync failed, cancelling remaining leagues");
      tasks.abort_all();
      while tasks.join_next().await.is_some() {}
      return Err(failure);
    }

    info!(leagues = report.leagues, teams = report.teams, "League stats updated");
    Ok(report)
  }
}
