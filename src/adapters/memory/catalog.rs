//! Markets and football metadata in one in-process catalog.
//!
//! Every upsert is keyed the same way as the relational schema: provider
//! ids for countries, leagues, seasons and teams; `market_code` for
//! markets; `(team, season)` for standings.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::StoreError;
use crate::domain::football::{
    CompetitionMeta, League, SeasonRow, SeasonUpsert, StandingLine, StandingRow, StaticCountry,
    StaticLeague, TeamUpsert,
};
use crate::domain::market::{MARKET_STATUS_OPEN, Market, NewMarket, TeamDetails};
use crate::ports::repository::{FootballMetaRepository, MarketRepository};

#[derive(Debug, Default)]
struct Catalog {
    countries: HashMap<i64, (Uuid, StaticCountry)>,
    leagues: HashMap<i64, League>,
    seasons: HashMap<i64, SeasonRow>,
    team_ids: HashMap<i64, Uuid>,
    teams: HashMap<Uuid, TeamDetails>,
    markets: HashMap<String, Market>,
    standings: HashMap<(Uuid, Uuid), StandingLine>,
}

impl Catalog {
    fn with_team(&self, market: &Market, with_team: bool) -> Market {
        let mut m = market.clone();
        m.team_details = if with_team {
            self.teams.get(&m.team_id).cloned()
        } else {
            None
        };
        m
    }

    fn competition_meta(&self, league: &League) -> Option<CompetitionMeta> {
        let (country_id, country) = self
            .countries
            .values()
            .find(|(id, _)| *id == league.country_id)?;
        Some(CompetitionMeta {
            id: league.id,
            name: league.name.clone(),
            code: league.code.clone(),
            emblem: league.emblem.clone(),
            football_org_id: league.football_org_id,
            country_id: *country_id,
            country_name: country.name.clone(),
            country_football_org_id: country.id,
            country_code: country.code.clone(),
            country_emblem: country.emblem.clone(),
        })
    }

    fn standing_row(&self, line: &StandingLine) -> Option<StandingRow> {
        let team = self.teams.get(&line.team_id)?;
        Some(StandingRow {
            team_id: line.team_id,
            league_id: line.league_id,
            season_id: line.season_id,
            played_games: line.played_games,
            won: line.won,
            draw: line.draw,
            lost: line.lost,
            points: line.points,
            goals_for: line.goals_for,
            goals_against: line.goals_against,
            goal_difference: line.goal_difference,
            position: line.position,
            team_name: team.name.clone(),
            team_short_name: team.short_name.clone(),
            team_code: team.code.clone(),
            team_tla: team.tla.clone(),
            team_emblem: team.emblem.clone(),
        })
    }
}

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    inner: RwLock<Catalog>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MarketRepository for MemoryCatalog {
    async fn upsert(&self, market: &NewMarket) -> Result<Market, StoreError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let row = inner
            .markets
            .entry(market.market_code.clone())
            .and_modify(|m| m.updated_at = now)
            .or_insert_with(|| Market {
                id: Uuid::new_v4(),
                team_id: market.team_id,
                market_name: market.market_name.clone(),
                market_code: market.market_code.clone(),
                last_price: market.last_price,
                status: MARKET_STATUS_OPEN.to_string(),
                volume_24h: market.volume_24h,
                total_volume: market.total_volume,
                open_price_24h: market.open_price_24h,
                created_at: now,
                updated_at: now,
                team_details: None,
            });
        Ok(row.clone())
    }

    async fn list(&self, with_team: bool) -> Result<Vec<Market>, StoreError> {
        let inner = self.inner.read().await;
        let mut markets: Vec<Market> = inner
            .markets
            .values()
            .map(|m| inner.with_team(m, with_team))
            .collect();
        markets.sort_by(|a, b| a.market_code.cmp(&b.market_code));
        Ok(markets)
    }

    async fn get(&self, id: Uuid, with_team: bool) -> Result<Market, StoreError> {
        let inner = self.inner.read().await;
        inner
            .markets
            .values()
            .find(|m| m.id == id)
            .map(|m| inner.with_team(m, with_team))
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl FootballMetaRepository for MemoryCatalog {
    async fn save_country(&self, country: &StaticCountry) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .countries
            .entry(country.id)
            .or_insert_with(|| (Uuid::new_v4(), country.clone()));
        Ok(())
    }

    async fn save_competition(&self, league: &StaticLeague) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let country_id = inner
            .countries
            .get(&league.country.id)
            .map(|(id, _)| *id)
            .ok_or(StoreError::NotFound)?;
        let now = Utc::now();
        inner.leagues.entry(league.id).or_insert_with(|| League {
            id: Uuid::new_v4(),
            name: league.name.clone(),
            code: league.code.clone(),
            emblem: league.emblem.clone(),
            football_org_id: league.id,
            country_id,
            created_at: now,
            updated_at: now,
        });
        Ok(())
    }

    async fn competitions(&self) -> Result<Vec<League>, StoreError> {
        let inner = self.inner.read().await;
        let mut leagues: Vec<League> = inner.leagues.values().cloned().collect();
        leagues.sort_by_key(|l| l.football_org_id);
        Ok(leagues)
    }

    async fn competition_meta(
        &self,
        league_id: Option<Uuid>,
    ) -> Result<Vec<CompetitionMeta>, StoreError> {
        let inner = self.inner.read().await;
        let mut leagues: Vec<&League> = inner
            .leagues
            .values()
            .filter(|l| league_id.is_none_or(|id| l.id == id))
            .collect();
        if league_id.is_some() && leagues.is_empty() {
            return Err(StoreError::NotFound);
        }
        leagues.sort_by_key(|l| l.football_org_id);
        Ok(leagues
            .into_iter()
            .filter_map(|l| inner.competition_meta(l))
            .collect())
    }

    async fn standings(
        &self,
        league_id: Option<Uuid>,
        season_id: Option<Uuid>,
    ) -> Result<Vec<StandingRow>, StoreError> {
        let inner = self.inner.read().await;
        let unknown_league =
            league_id.is_some_and(|id| !inner.leagues.values().any(|l| l.id == id));
        let unknown_season =
            season_id.is_some_and(|id| !inner.seasons.values().any(|s| s.id == id));
        if unknown_league || unknown_season {
            return Err(StoreError::NotFound);
        }
        let mut rows: Vec<StandingRow> = inner
            .standings
            .values()
            .filter(|s| league_id.is_none_or(|id| s.league_id == id))
            .filter(|s| season_id.is_none_or(|id| s.season_id == id))
            .filter_map(|s| inner.standing_row(s))
            .collect();
        rows.sort_by_key(|r| (r.league_id, r.season_id, r.position));
        Ok(rows)
    }

    async fn seasons(&self) -> Result<Vec<SeasonRow>, StoreError> {
        let inner = self.inner.read().await;
        let mut seasons: Vec<SeasonRow> = inner.seasons.values().cloned().collect();
        seasons.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(a.name.cmp(&b.name)));
        Ok(seasons)
    }

    async fn save_season(&self, season: &SeasonUpsert) -> Result<Uuid, StoreError> {
        let mut inner = self.inner.write().await;
        let row = inner
            .seasons
            .entry(season.football_org_id)
            .and_modify(|s| {
                s.match_day = season.match_day;
                s.end_date = season.end_date;
            })
            .or_insert_with(|| SeasonRow {
                id: Uuid::new_v4(),
                name: season.label.clone(),
                football_org_id: season.football_org_id,
                start_date: season.start_date,
                end_date: season.end_date,
                match_day: season.match_day,
                league_id: season.league_id,
            });
        Ok(row.id)
    }

    async fn save_team_with_league(&self, team: &TeamUpsert) -> Result<Uuid, StoreError> {
        let mut inner = self.inner.write().await;
        let id = *inner
            .team_ids
            .entry(team.football_org_id)
            .or_insert_with(Uuid::new_v4);
        inner.teams.insert(
            id,
            TeamDetails {
                id,
                name: team.name.clone(),
                short_name: team.short_name.clone(),
                code: team.code.clone(),
                tla: team.code.clone(),
                emblem: team.emblem.clone(),
                football_org_id: team.football_org_id,
            },
        );
        Ok(id)
    }

    async fn save_standings(&self, line: &StandingLine) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .standings
            .insert((line.team_id, line.season_id), line.clone());
        Ok(())
    }
}
