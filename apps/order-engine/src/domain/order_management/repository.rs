//! Order Repository Trait
//!
//! Storage for orders and their outbox entries. `create` writes the order
//! row and its pending-dispatch record in one atomic step, so an order is
//! never stored without a record that it still has to reach the queue.

use async_trait::async_trait;

use super::aggregate::{NewOrder, Order, OrderVersion};
use super::errors::RepositoryError;
use crate::domain::shared::{AccountId, InstrumentId, OrderId};

/// Repository trait for Order persistence.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Store a draft and its outbox entry atomically; assigns the id and
    /// timestamps.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the write fails; nothing is stored then.
    async fn create(&self, draft: &NewOrder) -> Result<Order, RepositoryError>;

    /// Find an order by id.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Every stored order, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError>;

    /// Orders for one instrument, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn list_by_instrument(
        &self,
        instrument_id: &InstrumentId,
    ) -> Result<Vec<Order>, RepositoryError>;

    /// OPEN and PARTIALLY_FILLED orders belonging to an account.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn list_open_by_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<Order>, RepositoryError>;

    /// Write back status and remaining quantity if the stored order is
    /// still at `expected`; refreshes `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no row has the order's id, `Conflict` when
    /// the stored status or remaining quantity no longer match `expected`.
    async fn update(
        &self,
        order: &Order,
        expected: &OrderVersion,
    ) -> Result<Order, RepositoryError>;

    /// Orders whose outbox entry is still pending, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn list_undispatched(&self, limit: usize) -> Result<Vec<Order>, RepositoryError>;

    /// Close the outbox entry after the queue acknowledged the order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    async fn mark_dispatched(&self, id: &OrderId) -> Result<(), RepositoryError>;

    /// Count a failed publish and keep the entry pending.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    async fn record_dispatch_failure(
        &self,
        id: &OrderId,
        reason: &str,
    ) -> Result<(), RepositoryError>;
}
