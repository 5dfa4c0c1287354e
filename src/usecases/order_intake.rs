//! Order Intake - Validate, Stamp and Append Orders
//!
//! Gate order: verification status, then structural checks, then one
//! append to the market's log. Market existence is deferred to the log
//! store. There is no retry and no in-process locking: the store's
//! append is the only serialization point, so concurrent submissions to
//! one market land in the order the store accepts them.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::metrics::MetricsRegistry;
use crate::domain::ServiceError;
use crate::domain::identity::Identity;
use crate::domain::order::{LogEntry, Order, OrderRequest, PlacedOrder, stream_key};
use crate::ports::order_log::OrderLog;

pub struct OrderIntake {
  log: Arc<dyn OrderLog>,
  stream_prefix: String,
  /// Label for the append latency histogram.
  backend: &'static str,
  metrics: Option<Arc<MetricsRegistry>>,
}

impl OrderIntake {
  pub fn new(log: Arc<dyn OrderLog>, stream_prefix: impl Into<String>) -> Self {
    Self {
      log,
      stream_prefix: stream_prefix.into(),
      backend: "memory",
      metrics: None,
    }
  }

  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>, backend: &'static str) -> Self {
    self.metrics = Some(metrics);
    self.backend = backend;
    self
  }

  /// Place one order on behalf of `identity`.
  #[instrument(
    skip(self, identity, request),
    fields(user_id = %identity.id, market_id = %request.market_id, order_id = tracing::field::Empty)
  )]
  pub async fn place_order(
    &self,
    identity: &Identity,
    request: &OrderRequest,
  ) -> Result<PlacedOrder, ServiceError> {
    if !identity.verified {
      self.record("forbidden");
      return Err(ServiceError::forbidden("verify your email before placing orders"));
    }

    let validated = request.validate().map_err(|e| {
      self.record("invalid");
      ServiceError::bad_request(e.to_string())
    })?;

    let order = Order::new(identity.id, validated);
    tracing::Span::current().record("order_id", tracing::field::display(order.order_id));
    let stream = stream_key(&self.stream_prefix, order.market_id);

    let started = Instant::now();
    let position = self.log.append(&stream, &order).await.map_err(|e| {
      self.record("store_error");
      error!(error = %e, stream = %stream, "Order append failed");
      ServiceError::internal("unable to record order, retry later")
    })?;

    if let Some(m) = &self.metrics {
      m.append_latency_us
        .with_label_values(&[self.backend])
        .observe(started.elapsed().as_micros() as f64);
    }
    self.record("ok");
    info!(position = %position, side = %order.side, price = order.price, quantity = order.quantity, "Order appended");

    Ok(PlacedOrder {
      order_id: order.order_id,
      market_id: order.market_id,
      position,
    })
  }

  /// Entries in a market's log.
  pub async fn log_len(&self, market_id: Uuid) -> Result<u64, ServiceError> {
    let stream = stream_key(&self.stream_prefix, market_id);
    Ok(self.log.len(&stream).await?)
  }

  /// Ranged read in append order for downstream consumers.
  pub async fn read_after(
    &self,
    market_id: Uuid,
    cursor: Option<&str>,
    count: usize,
  ) -> Result<Vec<LogEntry>, ServiceError> {
    let stream = stream_key(&self.stream_prefix, market_id);
    self.log.read_after(&stream, cursor, count).await.map_err(|e| {
      warn!(error = %e, stream = %stream, "Order log read failed");
      ServiceError::from(e)
    })
  }

  fn record(&self, outcome: &str) {
    if let Some(m) = &self.metrics {
      m.orders_appended.with_label_values(&[outcome]).inc();
    }
  }
}
