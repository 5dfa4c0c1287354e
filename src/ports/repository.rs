//! Repository Ports - Relational State
//!
//! Users and wallets, markets and football metadata. Writes that must be
//! atomic together (a user and its wallet) are a single port call so the
//! adapter can wrap them in one transaction.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::StoreError;
use crate::domain::football::{
  CompetitionMeta, League, SeasonRow, SeasonUpsert, StandingLine, StandingRow, StaticCountry,
  StaticLeague, TeamUpsert,
};
use crate::domain::identity::{
  AuthProvider, NewCredentialUser, OAuthProfile, User, UserWithSecret,
};
use crate::domain::market::{Market, NewMarket, Wallet};

#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
  /// Look up a user by `(email, provider)`.
  async fn find_by_email(
    &self,
    email: &str,
    provider: AuthProvider,
  ) -> Result<UserWithSecret, StoreError>;

  async fn find_by_id(&self, id: Uuid) -> Result<User, StoreError>;

  /// Insert a credentials user and an empty wallet in one transaction.
  /// `StoreError::Conflict` if the email is already registered.
  async fn create_with_wallet(&self, new_user: &NewCredentialUser) -> Result<User, StoreError>;

  /// Insert or update an OAuth user keyed by `(email, provider)`. The
  /// user is marked verified; a wallet is created only on first insert.
  async fn upsert_oauth_with_wallet(&self, profile: &OAuthProfile) -> Result<User, StoreError>;

  /// Set `verified = true`. `StoreError::NotFound` if no such user.
  async fn mark_verified(&self, id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait WalletRepository: Send + Sync + 'static {
  async fn wallet_for_user(&self, user_id: Uuid) -> Result<Wallet, StoreError>;
}

#[async_trait]
pub trait MarketRepository: Send + Sync + 'static {
  /// Create a market, or bump `updated_at` if the code already exists.
  async fn upsert(&self, market: &NewMarket) -> Result<Market, StoreError>;

  async fn list(&self, with_team: bool) -> Result<Vec<Market>, StoreError>;

  async fn get(&self, id: Uuid, with_team: bool) -> Result<Market, StoreError>;
}

#[async_trait]
pub trait FootballMetaRepository: Send + Sync + 'static {
  /// Idempotent on the provider id.
  async fn save_country(&self, country: &StaticCountry) -> Result<(), StoreError>;

  /// Idempotent on the provider id. `StoreError::NotFound` if the
  /// league's country was never saved.
  async fn save_competition(&self, league: &StaticLeague) -> Result<(), StoreError>;

  async fn competitions(&self) -> Result<Vec<League>, StoreError>;

  /// Leagues joined with their country, or just `league_id` when given.
  /// `StoreError::NotFound` if `league_id` names no league.
  async fn competition_meta(
    &self,
    league_id: Option<Uuid>,
  ) -> Result<Vec<CompetitionMeta>, StoreError>;

  /// Standings joined with team details, ordered by league, season and
  /// table position. Each filter is optional; `StoreError::NotFound` if
  /// a given id names no league or season.
  async fn standings(
    &self,
    league_id: Option<Uuid>,
    season_id: Option<Uuid>,
  ) -> Result<Vec<StandingRow>, StoreError>;

  /// Every season, newest first.
  async fn seasons(&self) -> Result<Vec<SeasonRow>, StoreError>;

  async fn save_season(&self, season: &SeasonUpsert) -> Result<Uuid, StoreError>;

  async fn save_team_with_league(&self, team: &TeamUpsert) -> Result<Uuid, StoreError>;

  async fn save_standings(&self, line: &StandingLine) -> Result<(), StoreError>;
}
