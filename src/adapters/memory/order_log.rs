//! Per-market order logs kept as in-process vectors.
//!
//! The write lock around `append` is the serialization point for
//! concurrent submissions, the way `XADD` is for Redis. Positions are
//! `0-<seq>` with `seq` starting at 1 in each stream.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::StoreError;
use crate::domain::order::{LogEntry, LogPosition, Order};
use crate::ports::order_log::OrderLog;

#[derive(Debug, Default)]
pub struct MemoryOrderLog {
    streams: RwLock<HashMap<String, Vec<LogEntry>>>,
}

impl MemoryOrderLog {
    pub fn new() -> Self {
        Self::default()
    }
}

fn position(seq: usize) -> LogPosition {
    format!("0-{seq}")
}

/// Sequence number encoded in a position produced by this log.
fn parse_seq(cursor: &str) -> Result<usize, StoreError> {
    cursor
        .strip_prefix("0-")
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| StoreError::backend(anyhow::anyhow!("invalid stream cursor {cursor:?}")))
}

#[async_trait]
impl OrderLog for MemoryOrderLog {
    async fn append(&self, stream: &str, order: &Order) -> Result<LogPosition, StoreError> {
        let mut streams = self.streams.write().await;
        let entries = streams.entry(stream.to_string()).or_default();
        let pos = position(entries.len() + 1);
        entries.push(LogEntry {
            position: pos.clone(),
            order: order.clone(),
        });
        Ok(pos)
    }

    async fn len(&self, stream: &str) -> Result<u64, StoreError> {
        let streams = self.streams.read().await;
        Ok(streams.get(stream).map_or(0, |e| e.len() as u64))
    }

    async fn read_after(
        &self,
        stream: &str,
        cursor: Option<&str>,
        count: usize,
    ) -> Result<Vec<LogEntry>, StoreError> {
        let skip = cursor.map(parse_seq).transpose()?.unwrap_or(0);
        let streams = self.streams.read().await;
        Ok(streams
            .get(stream)
            .map(|entries| entries.iter().skip(skip).take(count).cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderSide;
    use uuid::Uuid;

    fn order(price: i64) -> Order {
        Order {
            order_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            market_id: Uuid::nil(),
            price,
            quantity: 1,
            side: OrderSide::Buy,
        }
    }

    #[tokio::test]
    async fn test_positions_increase_per_stream() {
        let log = MemoryOrderLog::new();
        assert_eq!(log.append("a", &order(1)).await.unwrap(), "0-1");
        assert_eq!(log.append("a", &order(2)).await.unwrap(), "0-2");
        assert_eq!(log.append("b", &order(3)).await.unwrap(), "0-1");
        assert_eq!(log.len("a").await.unwrap(), 2);
        assert_eq!(log.len("missing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_read_after_cursor() {
        let log = MemoryOrderLog::new();
        for p in 1..=5 {
            log.append("s", &order(p)).await.unwrap();
        }
        let first = log.read_after("s", None, 2).await.unwrap();
        assert_eq!(first.iter().map(|e| e.order.price).collect::<Vec<_>>(), vec![1, 2]);

        let rest = log.read_after("s", Some(&first[1].position), 10).await.unwrap();
        assert_eq!(rest.iter().map(|e| e.order.price).collect::<Vec<_>>(), vec![3, 4, 5]);

        assert!(log.read_after("s", Some("bogus"), 1).await.is_err());
    }
}
