//! Markets and wallets (read-mostly projections).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Team attached to a market when team details are requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDetails {
    pub id: Uuid,
    pub name: String,
    pub short_name: String,
    pub code: String,
    pub tla: String,
    pub emblem: String,
    pub football_org_id: i64,
}

/// A tradeable market, one per team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub id: Uuid,
    pub team_id: Uuid,
    pub market_name: String,
    pub market_code: String,
    /// Minor currency units.
    pub last_price: i64,
    pub status: String,
    #[serde(rename = "volume24H")]
    pub volume_24h: i64,
    pub total_volume: i64,
    #[serde(rename = "openPrice24H")]
    pub open_price_24h: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_details: Option<TeamDetails>,
}

/// Fields for creating (or touching) a market keyed by `market_code`.
#[derive(Debug, Clone)]
pub struct NewMarket {
    pub team_id: Uuid,
    pub market_name: String,
    pub market_code: String,
    pub last_price: i64,
    pub volume_24h: i64,
    pub total_volume: i64,
    pub open_price_24h: i64,
}

impl NewMarket {
    /// A fresh market for a team with all price and volume stats zeroed.
    pub fn for_team(team_id: Uuid, name: &str, code: &str) -> Self {
        Self {
            team_id,
            market_name: name.to_string(),
            market_code: code.to_string(),
            last_price: 0,
            volume_24h: 0,
            total_volume: 0,
            open_price_24h: 0,
        }
    }
}

/// Status assigned to newly created markets.
pub const MARKET_STATUS_OPEN: &str = "OPEN";

/// A user's single wallet. Balance is in signed minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: Uuid,
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Empty wallet created alongside a new user.
    pub fn empty(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            balance: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
