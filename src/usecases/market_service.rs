//! Market Service - Market Queries and Upserts

use std::sync::Arc;

use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::market::{Market, NewMarket};
use crate::domain::{ServiceError, StoreError};
use crate::ports::repository::MarketRepository;

pub struct MarketService {
  repo: Arc<dyn MarketRepository>,
}

impl MarketService {
  pub fn new(repo: Arc<dyn MarketRepository>) -> Self {
    Self { repo }
  }

  pub async fn list(&self, with_team: bool) -> Result<Vec<Market>, ServiceError> {
    Ok(self.repo.list(with_team).await?)
  }

  /// One market by its id as received from the caller.
  #[instrument(skip(self))]
  pub async fn get(&self, raw_id: &str, with_team: bool) -> Result<Market, ServiceError> {
    let id = Uuid::parse_str(raw_id).map_err(|e| {
      debug!(error = %e, "Malformed market id");
      ServiceError::bad_request(format!("invalid market id {raw_id:?}"))
    })?;
    self.repo.get(id, with_team).await.map_err(|e| match e {
      StoreError::NotFound => ServiceError::not_found("no market exists with this id"),
      other => other.into(),
    })
  }

  /// Create the market, or bump `updated_at` when the code exists.
  pub async fn upsert(&self, market: &NewMarket) -> Result<Market, ServiceError> {
    Ok(self.repo.upsert(market).await?)
  }
}
