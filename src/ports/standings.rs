//! Standings Port - Football Data Provider

use async_trait::async_trait;

use crate::domain::football::StandingsResponse;

#[async_trait]
pub trait StandingsProvider: Send + Sync + 'static {
  /// Current standings of the competition with provider id `league_id`.
  async fn standings(&self, league_id: i64) -> anyhow::Result<StandingsResponse>;
}
