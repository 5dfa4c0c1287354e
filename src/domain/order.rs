//! Order intake domain types.
//!
//! An `Order` is the immutable record appended to a market's log. It is
//! built only from an `OrderRequest` that passed structural validation,
//! so every appended order has a positive price and quantity and a
//! known side.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque order identifier (UUID v4, 122 random bits).
pub type OrderId = Uuid;

/// Store-assigned position of an entry in a market log (e.g. `1700000000000-0`).
pub type LogPosition = String;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderSide {
    type Err = OrderValidationError;

    /// Exact match only: the log consumer keys on the upper-case form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            other => Err(OrderValidationError::InvalidSide(other.to_string())),
        }
    }
}

/// Why a candidate order was rejected before reaching the log.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderValidationError {
    #[error("price must be a positive integer in minor units, got {0}")]
    NonPositivePrice(i64),
    #[error("quantity must be a positive integer, got {0}")]
    NonPositiveQuantity(i64),
    #[error("side must be BUY or SELL, got {0:?}")]
    InvalidSide(String),
    #[error("market id {0:?} is not a valid UUID")]
    InvalidMarketId(String),
}

/// Raw order as submitted by a caller, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub market_id: String,
    pub price: i64,
    pub quantity: i64,
    /// `BUY` or `SELL`. Named `orderType` on the wire.
    #[serde(rename = "orderType")]
    pub side: String,
}

/// Fields of a request that passed structural validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedOrder {
    pub market_id: Uuid,
    pub price: i64,
    pub quantity: i64,
    pub side: OrderSide,
}

impl OrderRequest {
    /// Structural checks: price, quantity, side, then market id shape.
    ///
    /// Market existence is not checked here; the log append is the only
    /// existence check on the intake path.
    pub fn validate(&self) -> Result<ValidatedOrder, OrderValidationError> {
        if self.price <= 0 {
            return Err(OrderValidationError::NonPositivePrice(self.price));
        }
        if self.quantity <= 0 {
            return Err(OrderValidationError::NonPositiveQuantity(self.quantity));
        }
        let side = self.side.parse::<OrderSide>()?;
        let market_id = Uuid::parse_str(&self.market_id)
            .map_err(|_| OrderValidationError::InvalidMarketId(self.market_id.clone()))?;

        Ok(ValidatedOrder {
            market_id,
            price: self.price,
            quantity: self.quantity,
            side,
        })
    }
}

/// Immutable order record as carried by the market log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: Uuid,
    pub market_id: Uuid,
    pub price: i64,
    pub quantity: i64,
    #[serde(rename = "orderType")]
    pub side: OrderSide,
}

impl Order {
    /// Stamp a validated order with a fresh random id for `user_id`.
    pub fn new(user_id: Uuid, validated: ValidatedOrder) -> Self {
        Self {
            order_id: Uuid::new_v4(),
            user_id,
            market_id: validated.market_id,
            price: validated.price,
            quantity: validated.quantity,
            side: validated.side,
        }
    }

    /// Flat field list written as one stream record.
    pub fn to_fields(&self) -> [(&'static str, String); 6] {
        [
            ("orderId", self.order_id.to_string()),
            ("userId", self.user_id.to_string()),
            ("marketId", self.market_id.to_string()),
            ("price", self.price.to_string()),
            ("quantity", self.quantity.to_string()),
            ("orderType", self.side.as_str().to_string()),
        ]
    }

    /// Rebuild an order from a stream record's fields.
    pub fn from_fields<'a>(
        mut get: impl FnMut(&str) -> Option<&'a str>,
    ) -> Option<Self> {
        Some(Self {
            order_id: get("orderId")?.parse().ok()?,
            user_id: get("userId")?.parse().ok()?,
            market_id: get("marketId")?.parse().ok()?,
            price: get("price")?.parse().ok()?,
            quantity: get("quantity")?.parse().ok()?,
            side: get("orderType")?.parse().ok()?,
        })
    }
}

/// One entry read back from a market log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub position: LogPosition,
    pub order: Order,
}

/// Outcome of a successful placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub market_id: Uuid,
    pub position: LogPosition,
}

/// Name of the log that holds every order for `market_id`.
pub fn stream_key(prefix: &str, market_id: Uuid) -> String {
    format!("{prefix}{market_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn request(price: i64, quantity: i64, side: &str) -> OrderRequest {
        OrderRequest {
            market_id: "7f1b6a9e-3c44-4d2a-9b8e-0e7f8a1c2d3e".to_string(),
            price,
            quantity,
            side: side.to_string(),
        }
    }

    #[test]
    fn test_valid_request_passes() {
        let v = request(100, 5, "BUY").validate().unwrap();
        assert_eq!(v.price, 100);
        assert_eq!(v.quantity, 5);
        assert_eq!(v.side, OrderSide::Buy);
    }

    #[test]
    fn test_zero_quantity_rejected() {
        assert_eq!(
            request(100, 0, "BUY").validate(),
            Err(OrderValidationError::NonPositiveQuantity(0))
        );
    }

    #[test]
    fn test_negative_price_rejected() {
        assert_eq!(
            request(-1, 5, "SELL").validate(),
            Err(OrderValidationError::NonPositivePrice(-1))
        );
    }

    #[test]
    fn test_lowercase_side_rejected() {
        assert!(matches!(
            request(100, 5, "buy").validate(),
            Err(OrderValidationError::InvalidSide(_))
        ));
    }

    #[test]
    fn test_bad_market_id_rejected() {
        let mut r = request(100, 5, "BUY");
        r.market_id = "not-a-uuid".into();
        assert!(matches!(
            r.validate(),
            Err(OrderValidationError::InvalidMarketId(_))
        ));
    }

    #[test]
    fn test_fields_rebuild_order() {
        let order = Order::new(Uuid::new_v4(), request(250, 3, "SELL").validate().unwrap());
        let map: HashMap<&str, String> = order.to_fields().into_iter().collect();
        let rebuilt = Order::from_fields(|k| map.get(k).map(String::as_str)).unwrap();
        assert_eq!(rebuilt, order);
    }

    #[test]
    fn test_stream_key() {
        let id = Uuid::nil();
        assert_eq!(
            stream_key("ORDERS_", id),
            "ORDERS_00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_fresh_order_ids_differ() {
        let v = request(1, 1, "BUY").validate().unwrap();
        let user = Uuid::new_v4();
        assert_ne!(Order::new(user, v).order_id, Order::new(user, v).order_id);
    }
}
