//! Cancel Order Use Case

use std::sync::Arc;

use crate::application::errors::EngineError;
use crate::application::ports::OrderRepository;
use crate::application::services::apply_order_update;
use crate::domain::order_management::{CancelOutcome, Order};
use crate::domain::shared::OrderId;

/// Use case for cancelling a stored order.
pub struct CancelOrderUseCase<O>
where
    O: OrderRepository,
{
    orders: Arc<O>,
}

impl<O> CancelOrderUseCase<O>
where
    O: OrderRepository,
{
    /// Create a new `CancelOrderUseCase`.
    pub const fn new(orders: Arc<O>) -> Self {
        Self { orders }
    }

    /// Cancel an order by id.
    ///
    /// Cancelling an already CANCELLED order succeeds without a write.
    /// Remaining quantity is left untouched. A fill stored after the read
    /// wins: the cancel is re-checked against it and refused.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `InvalidState` for a FILLED order,
    /// `Conflict` if the order never stopped changing.
    pub async fn execute(&self, order_id: &OrderId) -> Result<Order, EngineError> {
        let applied = apply_order_update(self.orders.as_ref(), order_id, |order| {
            Ok(order.cancel()? == CancelOutcome::Cancelled)
        })
        .await?;

        if applied.written {
            tracing::info!(order_id = %order_id, from = %applied.previous, "Order cancelled");
        } else {
            tracing::debug!(order_id = %order_id, "Order already cancelled");
        }
        Ok(applied.order)
    }
}
