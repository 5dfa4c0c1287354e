//! Per-market order logs as Redis streams.
//!
//! `XADD <stream> *` lets Redis assign the entry id, which is the
//! position returned to callers. Redis executes commands one at a time,
//! so concurrent appends to one stream get strictly increasing ids.

use std::collections::HashMap;

use ::redis::AsyncCommands;
use ::redis::aio::ConnectionManager;
use ::redis::streams::StreamRangeReply;
use async_trait::async_trait;
use tracing::warn;

use crate::domain::StoreError;
use crate::domain::order::{LogEntry, LogPosition, Order};
use crate::ports::order_log::OrderLog;

#[derive(Clone)]
pub struct RedisOrderLog {
    conn: ConnectionManager,
}

impl RedisOrderLog {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl OrderLog for RedisOrderLog {
    async fn append(&self, stream: &str, order: &Order) -> Result<LogPosition, StoreError> {
        let fields = order.to_fields();
        let mut conn = self.conn.clone();
        conn.xadd::<_, _, _, _, String>(stream, "*", &fields[..])
            .await
            .map_err(StoreError::backend)
    }

    async fn len(&self, stream: &str) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        conn.xlen(stream).await.map_err(StoreError::backend)
    }

    async fn read_after(
        &self,
        stream: &str,
        cursor: Option<&str>,
        count: usize,
    ) -> Result<Vec<LogEntry>, StoreError> {
        // `(` makes the start bound exclusive.
        let start = cursor.map_or_else(|| "-".to_string(), |c| format!("({c}"));
        let mut conn = self.conn.clone();
        let reply: StreamRangeReply = conn
            .xrange_count(stream, start, "+", count)
            .await
            .map_err(StoreError::backend)?;

        let mut entries = Vec::with_capacity(reply.ids.len());
        for record in reply.ids {
            let fields: HashMap<String, String> = record
                .map
                .iter()
                .filter_map(|(k, v)| {
                    ::redis::from_redis_value::<String>(v)
                        .ok()
                        .map(|s| (k.clone(), s))
                })
                .collect();
            match Order::from_fields(|k| fields.get(k).map(String::as_str)) {
                Some(order) => entries.push(LogEntry {
                    position: record.id,
                    order,
                }),
                None => warn!(stream, id = %record.id, "Skipping malformed order entry"),
            }
        }
        Ok(entries)
    }
}
