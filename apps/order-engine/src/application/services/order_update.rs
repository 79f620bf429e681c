//! Conditional Order Writes
//!
//! Status changes are computed from a read and written only if the stored
//! order has not moved on in between. When it has, the order is read again
//! and the change re-run against the newer state, so a late cancel meets a
//! fill as the lifecycle demands instead of overwriting it.

use crate::application::errors::EngineError;
use crate::application::ports::OrderRepository;
use crate::domain::order_management::{Order, OrderStatus, RepositoryError};
use crate::domain::shared::OrderId;

/// Reads attempted before giving up on a contended order.
pub const MAX_UPDATE_ATTEMPTS: u32 = 8;

/// What a status change did.
#[derive(Debug, Clone)]
pub struct AppliedUpdate {
    /// The order as stored afterwards.
    pub order: Order,
    /// Status it was changed from.
    pub previous: OrderStatus,
    /// False when the change was a no-op and nothing was written.
    pub written: bool,
}

/// Read `order_id`, apply `change`, and write the result conditionally.
///
/// `change` mutates the order and returns whether there is anything to
/// write. It is run again on a fresh read whenever the write finds the
/// order changed underneath it.
///
/// # Errors
///
/// - `NotFound` for an unknown id
/// - whatever `change` returns, such as `InvalidState`
/// - `Conflict` when the order kept changing for every attempt
pub async fn apply_order_update<O, F>(
    orders: &O,
    order_id: &OrderId,
    mut change: F,
) -> Result<AppliedUpdate, EngineError>
where
    O: OrderRepository + ?Sized,
    F: FnMut(&mut Order) -> Result<bool, EngineError>,
{
    for attempt in 1..=MAX_UPDATE_ATTEMPTS {
        let mut order = orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| EngineError::order_not_found(order_id))?;
        let expected = order.version();

        if !change(&mut order)? {
            return Ok(AppliedUpdate {
                order,
                previous: expected.status,
                written: false,
            });
        }

        match orders.update(&order, &expected).await {
            Ok(saved) => {
                return Ok(AppliedUpdate {
                    order: saved,
                    previous: expected.status,
                    written: true,
                });
            }
            Err(RepositoryError::Conflict { .. }) => {
                tracing::debug!(
                    order_id = %order_id,
                    attempt,
                    "Order changed during update; re-reading"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::warn!(
        order_id = %order_id,
        attempts = MAX_UPDATE_ATTEMPTS,
        "Order update kept conflicting"
    );
    Err(RepositoryError::Conflict {
        order_id: order_id.to_string(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::errors::ErrorKind;
    use crate::domain::order_management::{CancelOutcome, NewOrder, OrderSide, OrderVersion};
    use crate::domain::shared::{AccountId, Amount, InstrumentId};
    use crate::infrastructure::persistence::InMemoryOrderRepository;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    fn draft() -> NewOrder {
        NewOrder::new(
            AccountId::new("A1"),
            InstrumentId::new("I1"),
            OrderSide::Buy,
            Amount::from(100u32),
            Amount::from(5u32),
        )
        .unwrap()
    }

    fn cancel(order: &mut Order) -> Result<bool, EngineError> {
        Ok(order.cancel()? == CancelOutcome::Cancelled)
    }

    /// Fills the order the first time an update is attempted, as if
    /// another writer got there first.
    struct FillsFirst {
        inner: InMemoryOrderRepository,
        raced: Mutex<bool>,
    }

    #[async_trait]
    impl OrderRepository for FillsFirst {
        async fn create(&self, draft: &NewOrder) -> Result<Order, RepositoryError> {
            self.inner.create(draft).await
        }

        async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
            self.inner.find_by_id(id).await
        }

        async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
            self.inner.list_all().await
        }

        async fn list_by_instrument(
            &self,
            instrument_id: &InstrumentId,
        ) -> Result<Vec<Order>, RepositoryError> {
            self.inner.list_by_instrument(instrument_id).await
        }

        async fn list_open_by_account(
            &self,
            account_id: &AccountId,
        ) -> Result<Vec<Order>, RepositoryError> {
            self.inner.list_open_by_account(account_id).await
        }

        async fn update(
            &self,
            order: &Order,
            expected: &OrderVersion,
        ) -> Result<Order, RepositoryError> {
            let race = !std::mem::replace(&mut *self.raced.lock(), true);
            if race {
                let mut filled = self.inner.find_by_id(order.id()).await?.unwrap();
                let version = filled.version();
                filled.apply_execution(OrderStatus::Filled, None).unwrap();
                self.inner.update(&filled, &version).await?;
            }
            self.inner.update(order, expected).await
        }

        async fn list_undispatched(&self, limit: usize) -> Result<Vec<Order>, RepositoryError> {
            self.inner.list_undispatched(limit).await
        }

        async fn mark_dispatched(&self, id: &OrderId) -> Result<(), RepositoryError> {
            self.inner.mark_dispatched(id).await
        }

        async fn record_dispatch_failure(
            &self,
            id: &OrderId,
            reason: &str,
        ) -> Result<(), RepositoryError> {
            self.inner.record_dispatch_failure(id, reason).await
        }
    }

    #[tokio::test]
    async fn writes_when_nothing_changed() {
        let repo = InMemoryOrderRepository::new();
        let id = repo.create(&draft()).await.unwrap().id().clone();

        let applied = apply_order_update(&repo, &id, cancel).await.unwrap();

        assert!(applied.written);
        assert_eq!(applied.previous, OrderStatus::Open);
        assert_eq!(applied.order.status(), OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn no_op_change_is_not_written() {
        let repo = InMemoryOrderRepository::new();
        let id = repo.create(&draft()).await.unwrap().id().clone();
        apply_order_update(&repo, &id, cancel).await.unwrap();

        let applied = apply_order_update(&repo, &id, cancel).await.unwrap();
        assert!(!applied.written);
    }

    #[tokio::test]
    async fn change_is_rerun_against_the_newer_state() {
        let repo = FillsFirst {
            inner: InMemoryOrderRepository::new(),
            raced: Mutex::new(false),
        };
        let id = repo.create(&draft()).await.unwrap().id().clone();

        let err = apply_order_update(&repo, &id, cancel)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let stored = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.status(), OrderStatus::Filled);
        assert!(stored.remaining_quantity().is_zero());
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let repo = InMemoryOrderRepository::new();
        let err = apply_order_update(&repo, &OrderId::new("missing"), cancel)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
