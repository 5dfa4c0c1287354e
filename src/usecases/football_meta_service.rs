//! Football Meta Service - Competitions, Standings and Seasons
//!
//! Read side of the data the league-stats job writes. Ids arrive as raw
//! query strings; an empty string means "no filter".

use std::sync::Arc;

use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::football::{CompetitionMeta, SeasonRow, StandingRow};
use crate::domain::{ServiceError, StoreError};
use crate::ports::repository::FootballMetaRepository;

pub struct FootballMetaService {
  repo: Arc<dyn FootballMetaRepository>,
}

fn optional_id(raw: Option<&str>, what: &str) -> Result<Option<Uuid>, ServiceError> {
  match raw.map(str::trim).filter(|s| !s.is_empty()) {
    None => Ok(None),
    Some(s) => Uuid::parse_str(s).map(Some).map_err(|e| {
      debug!(error = %e, what, "Malformed id");
      ServiceError::bad_request(format!("invalid {what} id {s:?}"))
    }),
  }
}

impl FootballMetaService {
  pub fn new(repo: Arc<dyn FootballMetaRepository>) -> Self {
    Self { repo }
  }

  /// Every competition, or the one named by `raw_league_id`.
  #[instrument(skip(self))]
  pub async fn competitions(
    &self,
    raw_league_id: Option<&str>,
  ) -> Result<Vec<CompetitionMeta>, ServiceError> {
    let league_id = optional_id(raw_league_id, "league")?;
    self.repo.competition_meta(league_id).await.map_err(|e| match e {
      StoreError::NotFound => {
        ServiceError::not_found("invalid league id, please select an existing league")
      }
      other => other.into(),
    })
  }

  #[instrument(skip(self))]
  pub async fn standings(
    &self,
    raw_league_id: Option<&str>,
    raw_season_id: Option<&str>,
  ) -> Result<Vec<StandingRow>, ServiceError> {
    let league_id = optional_id(raw_league_id, "league")?;
    let season_id = optional_id(raw_season_id, "season")?;
    self
      .repo
      .standings(league_id, season_id)
      .await
      .map_err(|e| match e {
        StoreError::NotFound => ServiceError::not_found(
          "invalid league or season id, please select an existing league or season",
        ),
        other => other.into(),
      })
  }

  pub async fn seasons(&self) -> Result<Vec<SeasonRow>, ServiceError> {
    Ok(self.repo.seasons().await?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::adapters::memory::MemoryCatalog;
  use crate::domain::ErrorKind;

  #[tokio::test]
  async fn test_ids_are_parsed_then_looked_up() {
    let svc = FootballMetaService::new(Arc::new(MemoryCatalog::new()));
    let unknown = Uuid::new_v4().to_string();

    assert_eq!(svc.competitions(Some("PL")).await.unwrap_err().kind, ErrorKind::BadRequest);
    assert_eq!(svc.competitions(Some(&unknown)).await.unwrap_err().kind, ErrorKind::NotFound);
    assert!(svc.competitions(Some("")).await.unwrap().is_empty());

    assert_eq!(
      svc.standings(None, Some("2025")).await.unwrap_err().kind,
      ErrorKind::BadRequest
    );
    assert_eq!(
      svc.standings(Some(&unknown), None).await.unwrap_err().kind,
      ErrorKind::NotFound
    );
    assert!(svc.standings(None, None).await.unwrap().is_empty());
    assert!(svc.seasons().await.unwrap().is_empty());
  }
}
