//! Update Order Status Use Case
//!
//! Entry point for downstream processing to report execution progress.
//! Every change goes through the aggregate's state machine; a request to
//! cancel takes the cancellation path.

use std::sync::Arc;

use crate::application::dto::UpdateOrderStatusRequest;
use crate::application::errors::EngineError;
use crate::application::ports::OrderRepository;
use crate::application::services::apply_order_update;
use crate::application::validation::{FieldViolation, parse_amount};
use crate::domain::order_management::{CancelOutcome, Order, OrderStatus, QUANTITY_SCALE};
use crate::domain::shared::{Amount, OrderId};

/// Use case for applying a status update to a stored order.
pub struct UpdateOrderStatusUseCase<O>
where
    O: OrderRepository,
{
    orders: Arc<O>,
}

impl<O> UpdateOrderStatusUseCase<O>
where
    O: OrderRepository,
{
    /// Create a new `UpdateOrderStatusUseCase`.
    pub const fn new(orders: Arc<O>) -> Self {
        Self { orders }
    }

    /// Apply `request` to the order with `order_id`.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a missing/unknown status, a malformed remaining
    ///   quantity, or one inconsistent with the target status
    /// - `NotFound` for an unknown id
    /// - `InvalidState` for a transition the lifecycle does not allow,
    ///   judged against the stored order at write time
    /// - `Conflict` if the order never stopped changing
    pub async fn execute(
        &self,
        order_id: &OrderId,
        request: &UpdateOrderStatusRequest,
    ) -> Result<Order, EngineError> {
        let (status, remaining) = parse_update(request)?;

        let applied = apply_order_update(self.orders.as_ref(), order_id, |order| {
            if status == OrderStatus::Cancelled {
                return Ok(order.cancel()? == CancelOutcome::Cancelled);
            }
            order.apply_execution(status, remaining)?;
            Ok(true)
        })
        .await?;

        if applied.written {
            tracing::info!(
                order_id = %order_id,
                from = %applied.previous,
                to = %applied.order.status(),
                remaining = %applied.order.remaining_quantity(),
                "Order status updated"
            );
        }
        Ok(applied.order)
    }
}

fn parse_update(
    request: &UpdateOrderStatusRequest,
) -> Result<(OrderStatus, Option<Amount>), FieldViolation> {
    let status = match request.status.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => text.parse::<OrderStatus>().map_err(|_| {
            FieldViolation::new(
                "status",
                "must be one of OPEN, PARTIALLY_FILLED, FILLED, CANCELLED",
            )
        })?,
        _ => return Err(FieldViolation::new("status", "is required")),
    };

    let remaining = match &request.remaining_quantity {
        None | Some(serde_json::Value::Null) => None,
        Some(_) if status == OrderStatus::Cancelled => {
            return Err(FieldViolation::new(
                "remaining_quantity",
                "must be omitted when cancelling",
            ));
        }
        Some(value) => {
            let amount = parse_amount("remaining_quantity", Some(value))?;
            if amount < Amount::ZERO {
                return Err(FieldViolation::new(
                    "remaining_quantity",
                    "must not be negative",
                ));
            }
            if amount.fractional_digits() > QUANTITY_SCALE {
                return Err(FieldViolation::new(
                    "remaining_quantity",
                    format!("must have at most {QUANTITY_SCALE} fractional digits"),
                ));
            }
            Some(amount)
        }
    };

    Ok((status, remaining))
}
