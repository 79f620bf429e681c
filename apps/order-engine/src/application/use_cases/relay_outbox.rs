//! Relay Outbox Use Case
//!
//! Sweeps orders whose dispatch is still pending and publishes each once
//! more. Delivery is at least once: an order may reach the queue twice if
//! it was published but its outbox entry was not closed.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::application::errors::EngineError;
use crate::application::ports::{OrderQueuePort, OrderRepository};
use crate::application::services::OrderDispatcher;
use crate::observability;
use crate::resilience::RetryPolicy;

/// Result of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayReport {
    /// Pending orders examined.
    pub scanned: usize,
    /// Orders the queue accepted.
    pub delivered: usize,
    /// Orders left pending.
    pub still_pending: usize,
}

/// Use case for re-dispatching outbox leftovers.
pub struct RelayOutboxUseCase<O, Q>
where
    O: OrderRepository,
    Q: OrderQueuePort,
{
    orders: Arc<O>,
    dispatcher: OrderDispatcher<O, Q>,
    batch_size: usize,
}

impl<O, Q> RelayOutboxUseCase<O, Q>
where
    O: OrderRepository,
    Q: OrderQueuePort,
{
    /// Create a relay publishing up to `batch_size` orders per sweep.
    pub fn new(orders: Arc<O>, queue: Arc<Q>, batch_size: usize) -> Self {
        let dispatcher = OrderDispatcher::new(Arc::clone(&orders), queue, RetryPolicy::once());
        Self {
            orders,
            dispatcher,
            batch_size: batch_size.max(1),
        }
    }

    /// Run one sweep over the oldest pending orders.
    ///
    /// # Errors
    ///
    /// Returns a repository error if the pending set cannot be listed.
    /// Individual publish failures are counted, not returned.
    pub async fn run_once(&self) -> Result<RelayReport, EngineError> {
        let pending = self.orders.list_undispatched(self.batch_size).await?;
        let mut report = RelayReport {
            scanned: pending.len(),
            ..RelayReport::default()
        };

        for order in &pending {
            if self.dispatcher.dispatch(order).await.is_delivered() {
                report.delivered += 1;
            } else {
                report.still_pending += 1;
            }
        }

        if report.scanned > 0 {
            observability::record_relay_delivered(report.delivered as u64);
            tracing::info!(
                scanned = report.scanned,
                delivered = report.delivered,
                still_pending = report.still_pending,
                "Outbox relay sweep finished"
            );
        }

        Ok(report)
    }

    /// Sweep every `interval` until `shutdown` is cancelled.
    pub async fn run_until_cancelled(&self, interval: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(interval_ms = interval.as_millis() as u64, "Outbox relay started");

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        tracing::error!(error = %e, "Outbox relay sweep failed");
                    }
                }
            }
        }

        tracing::info!("Outbox relay stopped");
    }
}
