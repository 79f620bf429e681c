//! Query Orders Use Case
//!
//! Read-only projections over the order store.

use std::sync::Arc;

use crate::application::dto::OrderDto;
use crate::application::errors::EngineError;
use crate::application::ports::OrderRepository;
use crate::domain::shared::{InstrumentId, OrderId};

/// Default cap on `list_undispatched` results.
pub const DEFAULT_UNDISPATCHED_LIMIT: usize = 100;

/// Use case for looking up and listing orders.
pub struct QueryOrdersUseCase<O>
where
    O: OrderRepository,
{
    orders: Arc<O>,
}

impl<O> QueryOrdersUseCase<O>
where
    O: OrderRepository,
{
    /// Create a new `QueryOrdersUseCase`.
    pub const fn new(orders: Arc<O>) -> Self {
        Self { orders }
    }

    /// One order by id.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub async fn find_by_id(&self, order_id: &OrderId) -> Result<OrderDto, EngineError> {
        self.orders
            .find_by_id(order_id)
            .await?
            .map(|order| OrderDto::from_order(&order))
            .ok_or_else(|| EngineError::order_not_found(order_id))
    }

    /// Every order, oldest first.
    pub async fn list_all(&self) -> Result<Vec<OrderDto>, EngineError> {
        let orders = self.orders.list_all().await?;
        Ok(orders.iter().map(OrderDto::from_order).collect())
    }

    /// Orders for one instrument, oldest first.
    pub async fn list_by_instrument(
        &self,
        instrument_id: &InstrumentId,
    ) -> Result<Vec<OrderDto>, EngineError> {
        let orders = self.orders.list_by_instrument(instrument_id).await?;
        Ok(orders.iter().map(OrderDto::from_order).collect())
    }

    /// Orders still waiting for the dispatch queue, oldest first.
    pub async fn list_undispatched(&self, limit: usize) -> Result<Vec<OrderDto>, EngineError> {
        let orders = self.orders.list_undispatched(limit).await?;
        Ok(orders.iter().map(OrderDto::from_order).collect())
    }
}
