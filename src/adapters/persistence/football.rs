//! Football metadata tables: countries, leagues, seasons, teams and
//! standings. Every write is an upsert on the provider id (or on
//! `(team, season)` for standings), so the cron can rerun safely.

use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use super::{PgStore, classify};
use crate::domain::StoreError;
use crate::domain::football::{
    CompetitionMeta, League, SeasonRow, SeasonUpsert, StandingLine, StandingRow, StaticCountry,
    StaticLeague, TeamUpsert,
};
use crate::ports::repository::FootballMetaRepository;

const COMPETITION_META: &str = "SELECT l.id, l.name, l.code, l.emblem, l.football_org_id, \
     c.id AS country_id, c.name AS country_name, c.football_org_id AS country_football_org_id, \
     c.code AS country_code, c.emblem AS country_emblem \
     FROM leagues l JOIN countries c ON c.id = l.country_id";

fn competition_from_row(row: &PgRow) -> Result<CompetitionMeta, sqlx::Error> {
    Ok(CompetitionMeta {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        code: row.try_get("code")?,
        emblem: row.try_get("emblem")?,
        football_org_id: row.try_get("football_org_id")?,
        country_id: row.try_get("country_id")?,
        country_name: row.try_get("country_name")?,
        country_football_org_id: row.try_get("country_football_org_id")?,
        country_code: row.try_get("country_code")?,
        country_emblem: row.try_get("country_emblem")?,
    })
}

fn standing_from_row(row: &PgRow) -> Result<StandingRow, sqlx::Error> {
    Ok(StandingRow {
        team_id: row.try_get("team_id")?,
        league_id: row.try_get("league_id")?,
        season_id: row.try_get("season_id")?,
        played_games: row.try_get("played_games")?,
        won: row.try_get("won")?,
        draw: row.try_get("draw")?,
        lost: row.try_get("lost")?,
        points: row.try_get("points")?,
        goals_for: row.try_get("goals_for")?,
        goals_against: row.try_get("goals_against")?,
        goal_difference: row.try_get("goal_difference")?,
        position: row.try_get("position")?,
        team_name: row.try_get("team_name")?,
        team_short_name: row.try_get("team_short_name")?,
        team_code: row.try_get("team_code")?,
        team_tla: row.try_get("team_tla")?,
        team_emblem: row.try_get("team_emblem")?,
    })
}

impl PgStore {
    /// `StoreError::NotFound` unless `table` has a row with this id.
    async fn require_row(&self, table: &str, id: Uuid) -> Result<(), StoreError> {
        let exists: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1)"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        if exists { Ok(()) } else { Err(StoreError::NotFound) }
    }
}

#[async_trait]
impl FootballMetaRepository for PgStore {
    async fn save_country(&self, country: &StaticCountry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO countries (name, code, emblem, football_org_id) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (football_org_id) DO NOTHING",
        )
        .bind(&country.name)
        .bind(&country.code)
        .bind(&country.emblem)
        .bind(country.id)
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, "country"))?;
        Ok(())
    }

    async fn save_competition(&self, league: &StaticLeague) -> Result<(), StoreError> {
        let country_id: Uuid = sqlx::query("SELECT id FROM countries WHERE football_org_id = $1")
            .bind(league.country.id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, "country"))?
            .try_get("id")
            .map_err(StoreError::backend)?;

        sqlx::query(
            "INSERT INTO leagues (name, code, emblem, football_org_id, country_id) \
             VALUES ($1, $2, $3, $4, $5) ON CONFLICT (football_org_id) DO NOTHING",
        )
        .bind(&league.name)
        .bind(&league.code)
        .bind(&league.emblem)
        .bind(league.id)
        .bind(country_id)
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, "league"))?;
        Ok(())
    }

    async fn competitions(&self) -> Result<Vec<League>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, code, emblem, football_org_id, country_id, created_at, updated_at \
             FROM leagues ORDER BY football_org_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify(e, "league"))?;

        rows.iter()
            .map(|row| {
                Ok(League {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    code: row.try_get("code")?,
                    emblem: row.try_get("emblem")?,
                    football_org_id: row.try_get("football_org_id")?,
                    country_id: row.try_get("country_id")?,
                    created_at: row.try_get("created_at")?,
                    updated_at: row.try_get("updated_at")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(StoreError::backend)
    }

    async fn competition_meta(
        &self,
        league_id: Option<Uuid>,
    ) -> Result<Vec<CompetitionMeta>, StoreError> {
        let rows = match league_id {
            Some(id) => {
                let row = sqlx::query(&format!("{COMPETITION_META} WHERE l.id = $1"))
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| classify(e, "league"))?;
                vec![row]
            }
            None => sqlx::query(&format!("{COMPETITION_META} ORDER BY l.football_org_id"))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| classify(e, "league"))?,
        };
        rows.iter()
            .map(competition_from_row)
            .collect::<Result<_, _>>()
            .map_err(StoreError::backend)
    }

    async fn standings(
        &self,
        league_id: Option<Uuid>,
        season_id: Option<Uuid>,
    ) -> Result<Vec<StandingRow>, StoreError> {
        if let Some(id) = league_id {
            self.require_row("leagues", id).await?;
        }
        if let Some(id) = season_id {
            self.require_row("seasons", id).await?;
        }
        let rows = sqlx::query(
            "SELECT s.team_id, s.league_id, s.season_id, s.played_games, s.won, s.draw, s.lost, \
             s.points, s.goals_for, s.goals_against, s.goal_difference, s.position, \
             t.name AS team_name, t.short_name AS team_short_name, t.code AS team_code, \
             t.tla AS team_tla, t.emblem AS team_emblem \
             FROM standings s JOIN teams t ON t.id = s.team_id \
             WHERE ($1::uuid IS NULL OR s.league_id = $1) \
               AND ($2::uuid IS NULL OR s.season_id = $2) \
             ORDER BY s.league_id, s.season_id, s.position",
        )
        .bind(league_id)
        .bind(season_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify(e, "standings"))?;

        rows.iter()
            .map(standing_from_row)
            .collect::<Result<_, _>>()
            .map_err(StoreError::backend)
    }

    async fn seasons(&self) -> Result<Vec<SeasonRow>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, football_org_id, start_date, end_date, match_day, league_id \
             FROM seasons ORDER BY start_date DESC, name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify(e, "season"))?;

        rows.iter()
            .map(|row| {
                Ok(SeasonRow {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    football_org_id: row.try_get("football_org_id")?,
                    start_date: row.try_get("start_date")?,
                    end_date: row.try_get("end_date")?,
                    match_day: row.try_get("match_day")?,
                    league_id: row.try_get("league_id")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(StoreError::backend)
    }

    async fn save_season(&self, season: &SeasonUpsert) -> Result<Uuid, StoreError> {
        sqlx::query(
            "INSERT INTO seasons (name, football_org_id, start_date, end_date, match_day, league_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (football_org_id) DO UPDATE \
             SET match_day = EXCLUDED.match_day, end_date = EXCLUDED.end_date \
             RETURNING id",
        )
        .bind(&season.label)
        .bind(season.football_org_id)
        .bind(season.start_date)
        .bind(season.end_date)
        .bind(season.match_day)
        .bind(season.league_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "season"))?
        .try_get("id")
        .map_err(StoreError::backend)
    }

    async fn save_team_with_league(&self, team: &TeamUpsert) -> Result<Uuid, StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        let team_id: Uuid = sqlx::query(
            "INSERT INTO teams (name, short_name, code, tla, emblem, football_org_id) \
             VALUES ($1, $2, $3, $3, $4, $5) \
             ON CONFLICT (football_org_id) DO UPDATE \
             SET name = EXCLUDED.name, short_name = EXCLUDED.short_name, \
                 emblem = EXCLUDED.emblem, updated_at = NOW() \
             RETURNING id",
        )
        .bind(&team.name)
        .bind(&team.short_name)
        .bind(&team.code)
        .bind(&team.emblem)
        .bind(team.football_org_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify(e, "team"))?
        .try_get("id")
        .map_err(StoreError::backend)?;

        sqlx::query(
            "INSERT INTO team_leagues (team_id, league_id, season_id) VALUES ($1, $2, $3) \
             ON CONFLICT DO NOTHING",
        )
        .bind(team_id)
        .bind(team.league_id)
        .bind(team.season_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| classify(e, "team league"))?;

        tx.commit().await.map_err(StoreError::backend)?;
        Ok(team_id)
    }

    async fn save_standings(&self, line: &StandingLine) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO standings (team_id, league_id, season_id, played_games, won, draw, lost, \
             points, goals_for, goals_against, goal_difference, position) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             ON CONFLICT (team_id, season_id) DO UPDATE SET \
             played_games = EXCLUDED.played_games, won = EXCLUDED.won, draw = EXCLUDED.draw, \
             lost = EXCLUDED.lost, points = EXCLUDED.points, goals_for = EXCLUDED.goals_for, \
             goals_against = EXCLUDED.goals_against, goal_difference = EXCLUDED.goal_difference, \
             position = EXCLUDED.position, updated_at = NOW()",
        )
        .bind(line.team_id)
        .bind(line.league_id)
        .bind(line.season_id)
        .bind(line.played_games)
        .bind(line.won)
        .bind(line.draw)
        .bind(line.lost)
        .bind(line.points)
        .bind(line.goals_for)
        .bind(line.goals_against)
        .bind(line.goal_difference)
        .bind(line.position)
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, "standings"))?;
        Ok(())
    }
}
