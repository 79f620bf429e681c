//! In-memory adapters for orders and reference data.
//!
//! Suitable for testing and local runs. Not for production use.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::order_management::{
    NewOrder, Order, OrderRepository, OrderVersion, RepositoryError,
};
use crate::domain::reference::{
    Account, AccountRepository, Balance, BalanceRepository, Instrument, InstrumentRepository,
    LookupError,
};
use crate::domain::shared::{AccountId, Amount, Asset, InstrumentId, OrderId, Timestamp};

/// In-memory implementation of `OrderRepository`.
///
/// Orders are kept in creation order, which doubles as the "oldest first"
/// order of every listing. The outbox state lives on the order itself.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<Vec<Order>>,
    fail_writes: AtomicBool,
}

impl InMemoryOrderRepository {
    /// Create a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of orders in the repository.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.read().len()
    }

    /// Check if the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.read().is_empty()
    }

    /// Make every subsequent write fail with `Storage` (for tests).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Storage("writes disabled".to_string()));
        }
        Ok(())
    }

    fn modify<F>(&self, id: &OrderId, f: F) -> Result<Order, RepositoryError>
    where
        F: FnOnce(&mut Order) -> Result<(), RepositoryError>,
    {
        self.check_writable()?;
        let mut orders = self.orders.write();
        let order = orders
            .iter_mut()
            .find(|o| o.id() == id)
            .ok_or_else(|| RepositoryError::NotFound {
                order_id: id.to_string(),
            })?;
        f(order)?;
        Ok(order.clone())
    }

    fn select<P>(&self, predicate: P) -> Vec<Order>
    where
        P: Fn(&Order) -> bool,
    {
        self.orders
            .read()
            .iter()
            .filter(|o| predicate(o))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, draft: &NewOrder) -> Result<Order, RepositoryError> {
        self.check_writable()?;
        let order = Order::from_new(OrderId::generate(), draft.clone(), Timestamp::now());
        self.orders.write().push(order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.read().iter().find(|o| o.id() == id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        Ok(self.select(|_| true))
    }

    async fn list_by_instrument(
        &self,
        instrument_id: &InstrumentId,
    ) -> Result<Vec<Order>, RepositoryError> {
        Ok(self.select(|o| o.instrument_id() == instrument_id))
    }

    async fn list_open_by_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<Order>, RepositoryError> {
        Ok(self.select(|o| o.account_id() == account_id && o.status().is_open()))
    }

    async fn update(
        &self,
        order: &Order,
        expected: &OrderVersion,
    ) -> Result<Order, RepositoryError> {
        order
            .check_invariants()
            .map_err(|e| RepositoryError::Corrupt {
                order_id: order.id().to_string(),
                reason: e.to_string(),
            })?;
        let status = order.status();
        let remaining = order.remaining_quantity();
        self.modify(order.id(), |stored| {
            if stored.version() != *expected {
                return Err(RepositoryError::Conflict {
                    order_id: stored.id().to_string(),
                });
            }
            *stored = stored.with_progress(status, remaining);
            stored.touch(Timestamp::now());
            Ok(())
        })
    }

    async fn list_undispatched(&self, limit: usize) -> Result<Vec<Order>, RepositoryError> {
        let mut pending = self.select(|o| !o.dispatch().is_dispatched());
        pending.truncate(limit);
        Ok(pending)
    }

    async fn mark_dispatched(&self, id: &OrderId) -> Result<(), RepositoryError> {
        self.modify(id, |o| {
            o.mark_dispatched();
            Ok(())
        })
        .map(|_| ())
    }

    async fn record_dispatch_failure(
        &self,
        id: &OrderId,
        reason: &str,
    ) -> Result<(), RepositoryError> {
        self.modify(id, |o| {
            o.record_dispatch_failure(reason);
            Ok(())
        })
        .map(|_| ())
    }
}

/// In-memory accounts, instruments and balances.
///
/// One value implements all three lookup ports so tests can share it.
#[derive(Debug, Default)]
pub struct InMemoryReferenceData {
    accounts: RwLock<HashMap<AccountId, Account>>,
    instruments: RwLock<HashMap<InstrumentId, Instrument>>,
    balances: RwLock<HashMap<(AccountId, Asset), Amount>>,
}

impl InMemoryReferenceData {
    /// Empty reference data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an account.
    pub fn add_account(&self, account: Account) {
        self.accounts.write().insert(account.id.clone(), account);
    }

    /// Insert or replace an instrument.
    pub fn add_instrument(&self, instrument: Instrument) {
        self.instruments
            .write()
            .insert(instrument.id.clone(), instrument);
    }

    /// Set the balance an account holds in an asset.
    pub fn set_balance(&self, account_id: AccountId, asset: Asset, amount: Amount) {
        self.balances.write().insert((account_id, asset), amount);
    }
}

#[async_trait]
impl AccountRepository for InMemoryReferenceData {
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, LookupError> {
        Ok(self.accounts.read().get(id).cloned())
    }
}

#[async_trait]
impl InstrumentRepository for InMemoryReferenceData {
    async fn find_by_id(&self, id: &InstrumentId) -> Result<Option<Instrument>, LookupError> {
        Ok(self.instruments.read().get(id).cloned())
    }
}

#[async_trait]
impl BalanceRepository for InMemoryReferenceData {
    async fn find_by_account_and_asset(
        &self,
        account_id: &AccountId,
        asset: &Asset,
    ) -> Result<Option<Balance>, LookupError> {
        let key = (account_id.clone(), asset.clone());
        Ok(self.balances.read().get(&key).map(|amount| Balance {
            account_id: account_id.clone(),
            asset: asset.clone(),
            amount: *amount,
        }))
    }
}
