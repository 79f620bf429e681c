//! Order Dispatcher
//!
//! Hands a stored order to the queue and records the result in the
//! order's outbox entry. Shared by placement (inline dispatch) and the
//! outbox relay.

use std::sync::Arc;

use crate::application::ports::{OrderQueuePort, OrderRepository, QueueError};
use crate::domain::order_management::Order;
use crate::observability;
use crate::resilience::{RetryExhausted, RetryPolicy, retry_async};

/// Result of one dispatch round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The queue accepted the order.
    Delivered {
        /// Publish calls made.
        attempts: u32,
    },
    /// Every publish failed; the outbox entry stays pending.
    Pending {
        /// Publish calls made.
        attempts: u32,
        /// Last queue error.
        reason: String,
    },
}

impl DispatchOutcome {
    /// True when the queue accepted the order.
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Publishes orders with bounded retry and updates their outbox entries.
pub struct OrderDispatcher<O, Q>
where
    O: OrderRepository,
    Q: OrderQueuePort,
{
    orders: Arc<O>,
    queue: Arc<Q>,
    policy: RetryPolicy,
}

impl<O, Q> OrderDispatcher<O, Q>
where
    O: OrderRepository,
    Q: OrderQueuePort,
{
    /// Create a dispatcher.
    pub const fn new(orders: Arc<O>, queue: Arc<Q>, policy: RetryPolicy) -> Self {
        Self {
            orders,
            queue,
            policy,
        }
    }

    /// Publish `order`, retrying transient queue failures, then close or
    /// annotate its outbox entry.
    ///
    /// A failure to update the outbox entry is logged, not returned: a
    /// delivered order left pending is redelivered by the relay, and a
    /// failed one stays pending either way.
    pub async fn dispatch(&self, order: &Order) -> DispatchOutcome {
        let order_id = order.id();
        let published = retry_async(
            &self.policy,
            || self.queue.publish(order),
            QueueError::is_retryable,
        )
        .await;

        match published {
            Ok(((), attempts)) => {
                observability::record_dispatch("delivered");
                if let Err(e) = self.orders.mark_dispatched(order_id).await {
                    tracing::warn!(
                        order_id = %order_id,
                        error = %e,
                        "Order delivered but outbox entry not closed; relay will redeliver"
                    );
                }
                tracing::debug!(order_id = %order_id, attempts, "Order dispatched");
                DispatchOutcome::Delivered { attempts }
            }
            Err(RetryExhausted { error, attempts }) => {
                observability::record_dispatch("failed");
                let reason = error.to_string();
                if let Err(e) = self.orders.record_dispatch_failure(order_id, &reason).await {
                    tracing::warn!(
                        order_id = %order_id,
                        error = %e,
                        "Failed to record dispatch failure"
                    );
                }
                tracing::warn!(
                    order_id = %order_id,
                    attempts,
                    error = %reason,
                    "Order dispatch failed; left pending in outbox"
                );
                DispatchOutcome::Pending { attempts, reason }
            }
        }
    }
}
