//! Football metadata: static competitions, standings payloads from
//! football-data.org, and the derived rows we persist.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ────────────────────────────────────────────
// Static competitions file
// ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticCountry {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub emblem: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticLeague {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub emblem: String,
    pub country: StaticCountry,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticCompetitions {
    pub competitions: Vec<StaticLeague>,
}

/// A league row as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct League {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub emblem: String,
    pub football_org_id: i64,
    pub country_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ────────────────────────────────────────────
// Read models served to clients
// ────────────────────────────────────────────

/// A league joined with its country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionMeta {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub emblem: String,
    pub football_org_id: i64,
    pub country_id: Uuid,
    pub country_name: String,
    pub country_football_org_id: i64,
    pub country_code: String,
    pub country_emblem: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonRow {
    pub id: Uuid,
    pub name: String,
    pub football_org_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub match_day: i64,
    pub league_id: Uuid,
}

/// A standings line joined with its team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingRow {
    pub team_id: Uuid,
    pub league_id: Uuid,
    pub season_id: Uuid,
    pub played_games: i64,
    pub won: i64,
    pub draw: i64,
    pub lost: i64,
    pub points: i64,
    pub goals_for: i64,
    pub goals_against: i64,
    pub goal_difference: i64,
    pub position: i64,
    pub team_name: String,
    pub team_short_name: String,
    pub team_code: String,
    pub team_tla: String,
    pub team_emblem: String,
}

// ────────────────────────────────────────────
// football-data.org standings response
// ────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct StandingsResponse {
    pub filters: Filters,
    pub season: Season,
    pub standings: Vec<Standing>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Filters {
    pub season: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Season {
    pub id: i64,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub current_matchday: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Standing {
    #[serde(rename = "type")]
    pub kind: String,
    pub table: Vec<TableEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableEntry {
    pub position: i64,
    pub team: Team,
    pub played_games: i64,
    pub won: i64,
    pub draw: i64,
    pub lost: i64,
    pub goals_for: i64,
    pub goals_against: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub tla: String,
    #[serde(default)]
    pub crest: String,
}

/// Only overall tables are ingested; HOME/AWAY splits are skipped.
pub const TOTAL_STANDING: &str = "TOTAL";

// ────────────────────────────────────────────
// Derived rows
// ────────────────────────────────────────────

/// Season upsert keyed by the provider's season id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonUpsert {
    pub label: String,
    pub football_org_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub match_day: i64,
    pub league_id: Uuid,
}

impl SeasonUpsert {
    /// Label is `<filter season>-<league code>`, e.g. `2025-PL`.
    pub fn from_response(resp: &StandingsResponse, league: &League) -> anyhow::Result<Self> {
        Ok(Self {
            label: format!("{}-{}", resp.filters.season, league.code),
            football_org_id: resp.season.id,
            start_date: parse_day(&resp.season.start_date)?,
            end_date: parse_day(&resp.season.end_date)?,
            match_day: resp.season.current_matchday.unwrap_or(0),
            league_id: league.id,
        })
    }
}

fn parse_day(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("invalid season date {raw:?}: {e}"))
}

/// Team upsert keyed by the provider's team id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamUpsert {
    pub name: String,
    pub short_name: String,
    /// Unique code, also used as the TLA column.
    pub code: String,
    pub emblem: String,
    pub football_org_id: i64,
    pub league_id: Uuid,
    pub season_id: Uuid,
}

impl TeamUpsert {
    pub fn from_entry(entry: &TableEntry, league_id: Uuid, season_id: Uuid) -> Self {
        Self {
            name: entry.team.name.clone(),
            short_name: entry.team.short_name.clone(),
            code: unique_tla(&entry.team),
            emblem: entry.team.crest.clone(),
            football_org_id: entry.team.id,
            league_id,
            season_id,
        }
    }
}

/// Provider TLAs collide across leagues, so suffix the provider id.
/// Teams without a TLA fall back to their id: `<tla or id>_<id>`.
pub fn unique_tla(team: &Team) -> String {
    let id = team.id.to_string();
    let tla = if team.tla.is_empty() { id.as_str() } else { team.tla.as_str() };
    format!("{tla}_{id}")
}

/// A validated standings row with derived points and goal difference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandingLine {
    pub team_id: Uuid,
    pub league_id: Uuid,
    pub season_id: Uuid,
    pub played_games: i64,
    pub won: i64,
    pub draw: i64,
    pub lost: i64,
    pub points: i64,
    pub goals_for: i64,
    pub goals_against: i64,
    pub goal_difference: i64,
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid standings: won ({won}) + draw ({draw}) + lost ({lost}) must equal played games ({played})")]
pub struct InvalidStandings {
    pub won: i64,
    pub draw: i64,
    pub lost: i64,
    pub played: i64,
}

impl StandingLine {
    pub fn new(
        entry: &TableEntry,
        team_id: Uuid,
        league_id: Uuid,
        season_id: Uuid,
    ) -> Result<Self, InvalidStandings> {
        if entry.won + entry.draw + entry.lost != entry.played_games {
            return Err(InvalidStandings {
                won: entry.won,
                draw: entry.draw,
                lost: entry.lost,
                played: entry.played_games,
            });
        }
        Ok(Self {
            team_id,
            league_id,
            season_id,
            played_games: entry.played_games,
            won: entry.won,
            draw: entry.draw,
            lost: entry.lost,
            points: entry.won * 3 + entry.draw,
            goals_for: entry.goals_for,
            goals_against: entry.goals_against,
            goal_difference: entry.goals_for - entry.goals_against,
            position: entry.position,
        })
    }
}
