//! `markets` table, optionally joined with `teams`.

use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use super::{PgStore, classify};
use crate::domain::StoreError;
use crate::domain::market::{Market, NewMarket, TeamDetails};
use crate::ports::repository::MarketRepository;

const MARKET_COLUMNS: &str = "m.id, m.team_id, m.market_name, m.market_code, m.last_price, \
     m.status, m.volume_24h, m.total_volume, m.open_price_24h, m.created_at, m.updated_at";

const TEAM_COLUMNS: &str = "t.name AS team_name, t.short_name AS team_short_name, \
     t.code AS team_code, t.tla AS team_tla, t.emblem AS team_emblem, \
     t.football_org_id AS team_football_org_id";

fn select(with_team: bool) -> String {
    if with_team {
        format!("SELECT {MARKET_COLUMNS}, {TEAM_COLUMNS} FROM markets m JOIN teams t ON t.id = m.team_id")
    } else {
        format!("SELECT {MARKET_COLUMNS} FROM markets m")
    }
}

fn market_from_row(row: &PgRow, with_team: bool) -> Result<Market, sqlx::Error> {
    let team_id: Uuid = row.try_get("team_id")?;
    let team_details = if with_team {
        Some(TeamDetails {
            id: team_id,
            name: row.try_get("team_name")?,
            short_name: row.try_get("team_short_name")?,
            code: row.try_get("team_code")?,
            tla: row.try_get("team_tla")?,
            emblem: row.try_get("team_emblem")?,
            football_org_id: row.try_get("team_football_org_id")?,
        })
    } else {
        None
    };
    Ok(Market {
        id: row.try_get("id")?,
        team_id,
        market_name: row.try_get("market_name")?,
        market_code: row.try_get("market_code")?,
        last_price: row.try_get("last_price")?,
        status: row.try_get("status")?,
        volume_24h: row.try_get("volume_24h")?,
        total_volume: row.try_get("total_volume")?,
        open_price_24h: row.try_get("open_price_24h")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        team_details,
    })
}

#[async_trait]
impl MarketRepository for PgStore {
    async fn upsert(&self, market: &NewMarket) -> Result<Market, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO markets AS m (team_id, market_name, market_code, last_price, \
             volume_24h, total_volume, open_price_24h) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (market_code) DO UPDATE SET updated_at = NOW() \
             RETURNING {MARKET_COLUMNS}"
        ))
        .bind(market.team_id)
        .bind(&market.market_name)
        .bind(&market.market_code)
        .bind(market.last_price)
        .bind(market.volume_24h)
        .bind(market.total_volume)
        .bind(market.open_price_24h)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "market"))?;
        market_from_row(&row, false).map_err(StoreError::backend)
    }

    async fn list(&self, with_team: bool) -> Result<Vec<Market>, StoreError> {
        let rows = sqlx::query(&format!("{} ORDER BY m.market_code", select(with_team)))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| classify(e, "market"))?;
        rows.iter()
            .map(|row| market_from_row(row, with_team))
            .collect::<Result<_, _>>()
            .map_err(StoreError::backend)
    }

    async fn get(&self, id: Uuid, with_team: bool) -> Result<Market, StoreError> {
        let row = sqlx::query(&format!("{} WHERE m.id = $1", select(with_team)))
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, "market"))?;
        market_from_row(&row, with_team).map_err(StoreError::backend)
    }
}
