//! Order Log Port - Per-Market Append-Only Log
//!
//! The log store is the only serialization point for concurrent
//! submissions: `append` must be atomic and assign a strictly
//! increasing position within a stream.

use async_trait::async_trait;

use crate::domain::StoreError;
use crate::domain::order::{LogEntry, LogPosition, Order};

#[async_trait]
pub trait OrderLog: Send + Sync + 'static {
  /// Append one order record to `stream`. Returns the store-assigned
  /// position once the store has acknowledged the write.
  async fn append(&self, stream: &str, order: &Order) -> Result<LogPosition, StoreError>;

  /// Number of entries in `stream` (0 if it does not exist).
  async fn len(&self, stream: &str) -> Result<u64, StoreError>;

  /// Up to `count` entries strictly after `cursor`, in append order.
  /// `None` reads from the beginning.
  async fn read_after(
    &self,
    stream: &str,
    cursor: Option<&str>,
    count: usize,
  ) -> Result<Vec<LogEntry>, StoreError>;
}
