//! Dependency Injection Container
//!
//! Builds the storage and queue adapters named in the configuration and
//! wires them into the use cases.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::application::dto::OrderDispatchMessage;
use crate::application::ports::{
    AccountRepository, BalanceRepository, InstrumentRepository, OrderQueuePort, OrderRepository,
    QueueError,
};
use crate::application::use_cases::{
    CancelOrderUseCase, PlaceOrderConfig, PlaceOrderUseCase, QueryOrdersUseCase,
    RelayOutboxUseCase, UpdateOrderStatusUseCase,
};
use crate::config::{Config, PersistenceBackend, QueueBackend};
use crate::domain::order_management::{NewOrder, Order, OrderVersion, RepositoryError};
use crate::domain::reference::{Account, Balance, Instrument, LookupError};
use crate::domain::shared::{AccountId, Asset, InstrumentId, OrderId};
use crate::infrastructure::http::AppState;
use crate::infrastructure::messaging::{ChannelOrderQueue, NatsOrderQueue};
use crate::infrastructure::persistence::{
    InMemoryOrderRepository, InMemoryReferenceData, PersistenceError, TursoOrderRepository,
    TursoReferenceRepository, TursoStore,
};

/// Failure to build the container.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// The database could not be opened or migrated.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// The queue could not be reached.
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Order storage selected by configuration.
#[derive(Debug)]
pub enum OrderStore {
    /// Process memory.
    Memory(InMemoryOrderRepository),
    /// Turso database.
    Turso(TursoOrderRepository),
}

/// Reference data selected by configuration.
#[derive(Debug)]
pub enum ReferenceStore {
    /// Process memory.
    Memory(InMemoryReferenceData),
    /// Turso database.
    Turso(TursoReferenceRepository),
}

/// Dispatch queue selected by configuration.
#[derive(Debug)]
pub enum DispatchQueue {
    /// In-process channel.
    Channel(ChannelOrderQueue),
    /// NATS subject.
    Nats(NatsOrderQueue),
}

/// Application state with the configured adapters.
pub type ConfiguredState =
    AppState<ReferenceStore, ReferenceStore, ReferenceStore, OrderStore, DispatchQueue>;

/// Dependency injection container.
///
/// Holds the wired adapters. Use [`Container::from_config`] to build one
/// from configuration or [`Container::new`] with existing adapters.
pub struct Container {
    config: Config,
    reference: Arc<ReferenceStore>,
    orders: Arc<OrderStore>,
    queue: Arc<DispatchQueue>,
}

impl Container {
    /// Create a container from already-built adapters.
    pub fn new(
        config: Config,
        reference: Arc<ReferenceStore>,
        orders: Arc<OrderStore>,
        queue: Arc<DispatchQueue>,
    ) -> Self {
        Self {
            config,
            reference,
            orders,
            queue,
        }
    }

    /// Open storage (running migrations) and connect the queue.
    ///
    /// The memory queue is drained by a background task that logs each
    /// message.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError` if the database or queue is unreachable.
    pub async fn from_config(config: Config) -> Result<Self, ContainerError> {
        let (reference, orders) = match config.persistence.backend {
            PersistenceBackend::Memory => (
                ReferenceStore::Memory(InMemoryReferenceData::new()),
                OrderStore::Memory(InMemoryOrderRepository::new()),
            ),
            PersistenceBackend::Turso => {
                let store = TursoStore::open(&config.persistence.db_path).await?;
                let applied = store.migrate().await?;
                tracing::info!(applied, "Database migrations complete");
                (
                    ReferenceStore::Turso(TursoReferenceRepository::new(store.clone())),
                    OrderStore::Turso(TursoOrderRepository::new(store)),
                )
            }
        };

        let queue = match config.queue.backend {
            QueueBackend::Memory => {
                let (queue, rx) = ChannelOrderQueue::bounded(config.queue.channel_capacity);
                tokio::spawn(drain_channel(rx));
                DispatchQueue::Channel(queue)
            }
            QueueBackend::Nats => DispatchQueue::Nats(
                NatsOrderQueue::connect(
                    &config.queue.url,
                    config.queue.subject.clone(),
                    Duration::from_millis(config.queue.publish_timeout_ms),
                )
                .await?,
            ),
        };

        Ok(Self::new(
            config,
            Arc::new(reference),
            Arc::new(orders),
            Arc::new(queue),
        ))
    }

    /// Get the reference data store.
    pub fn reference(&self) -> Arc<ReferenceStore> {
        Arc::clone(&self.reference)
    }

    /// Get the order store.
    pub fn orders(&self) -> Arc<OrderStore> {
        Arc::clone(&self.orders)
    }

    /// Create a `PlaceOrderUseCase`.
    pub fn place_order_use_case(
        &self,
    ) -> PlaceOrderUseCase<ReferenceStore, ReferenceStore, ReferenceStore, OrderStore, DispatchQueue>
    {
        PlaceOrderUseCase::new(
            Arc::clone(&self.reference),
            Arc::clone(&self.reference),
            Arc::clone(&self.reference),
            Arc::clone(&self.orders),
            Arc::clone(&self.queue),
            PlaceOrderConfig {
                dispatch_retry: self.config.engine.dispatch_retry.to_policy(),
                reserve_open_orders: self.config.engine.reserve_open_orders,
            },
        )
    }

    /// Create a `CancelOrderUseCase`.
    pub fn cancel_order_use_case(&self) -> CancelOrderUseCase<OrderStore> {
        CancelOrderUseCase::new(Arc::clone(&self.orders))
    }

    /// Create an `UpdateOrderStatusUseCase`.
    pub fn update_status_use_case(&self) -> UpdateOrderStatusUseCase<OrderStore> {
        UpdateOrderStatusUseCase::new(Arc::clone(&self.orders))
    }

    /// Create a `QueryOrdersUseCase`.
    pub fn query_orders_use_case(&self) -> QueryOrdersUseCase<OrderStore> {
        QueryOrdersUseCase::new(Arc::clone(&self.orders))
    }

    /// Create a `RelayOutboxUseCase`.
    pub fn relay_outbox_use_case(&self) -> RelayOutboxUseCase<OrderStore, DispatchQueue> {
        RelayOutboxUseCase::new(
            Arc::clone(&self.orders),
            Arc::clone(&self.queue),
            self.config.engine.relay_batch_size,
        )
    }

    /// HTTP application state.
    pub fn app_state(&self) -> ConfiguredState {
        AppState {
            place_order: Arc::new(self.place_order_use_case()),
            cancel_order: Arc::new(self.cancel_order_use_case()),
            update_status: Arc::new(self.update_status_use_case()),
            query_orders: Arc::new(self.query_orders_use_case()),
            request_timeout: Duration::from_millis(self.config.server.request_timeout_ms),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

async fn drain_channel(mut rx: mpsc::Receiver<OrderDispatchMessage>) {
    while let Some(message) = rx.recv().await {
        tracing::info!(
            order_id = %message.id,
            account_id = %message.account_id,
            "Order received on in-process queue"
        );
    }
}

#[async_trait]
impl OrderRepository for OrderStore {
    async fn create(&self, draft: &NewOrder) -> Result<Order, RepositoryError> {
        match self {
            Self::Memory(repo) => repo.create(draft).await,
            Self::Turso(repo) => repo.create(draft).await,
        }
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        match self {
            Self::Memory(repo) => repo.find_by_id(id).await,
            Self::Turso(repo) => repo.find_by_id(id).await,
        }
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        match self {
            Self::Memory(repo) => repo.list_all().await,
            Self::Turso(repo) => repo.list_all().await,
        }
    }

    async fn list_by_instrument(
        &self,
        instrument_id: &InstrumentId,
    ) -> Result<Vec<Order>, RepositoryError> {
        match self {
            Self::Memory(repo) => repo.list_by_instrument(instrument_id).await,
            Self::Turso(repo) => repo.list_by_instrument(instrument_id).await,
        }
    }

    async fn list_open_by_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<Order>, RepositoryError> {
        match self {
            Self::Memory(repo) => repo.list_open_by_account(account_id).await,
            Self::Turso(repo) => repo.list_open_by_account(account_id).await,
        }
    }

    async fn update(
        &self,
        order: &Order,
        expected: &OrderVersion,
    ) -> Result<Order, RepositoryError> {
        match self {
            Self::Memory(repo) => repo.update(order, expected).await,
            Self::Turso(repo) => repo.update(order, expected).await,
        }
    }

    async fn list_undispatched(&self, limit: usize) -> Result<Vec<Order>, RepositoryError> {
        match self {
            Self::Memory(repo) => repo.list_undispatched(limit).await,
            Self::Turso(repo) => repo.list_undispatched(limit).await,
        }
    }

    async fn mark_dispatched(&self, id: &OrderId) -> Result<(), RepositoryError> {
        match self {
            Self::Memory(repo) => repo.mark_dispatched(id).await,
            Self::Turso(repo) => repo.mark_dispatched(id).await,
        }
    }

    async fn record_dispatch_failure(
        &self,
        id: &OrderId,
        reason: &str,
    ) -> Result<(), RepositoryError> {
        match self {
            Self::Memory(repo) => repo.record_dispatch_failure(id, reason).await,
            Self::Turso(repo) => repo.record_dispatch_failure(id, reason).await,
        }
    }
}

#[async_trait]
impl AccountRepository for ReferenceStore {
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, LookupError> {
        match self {
            Self::Memory(data) => AccountRepository::find_by_id(data, id).await,
            Self::Turso(repo) => AccountRepository::find_by_id(repo, id).await,
        }
    }
}

#[async_trait]
impl InstrumentRepository for ReferenceStore {
    async fn find_by_id(&self, id: &InstrumentId) -> Result<Option<Instrument>, LookupError> {
        match self {
            Self::Memory(data) => InstrumentRepository::find_by_id(data, id).await,
            Self::Turso(repo) => InstrumentRepository::find_by_id(repo, id).await,
        }
    }
}

#[async_trait]
impl BalanceRepository for ReferenceStore {
    async fn find_by_account_and_asset(
        &self,
        account_id: &AccountId,
        asset: &Asset,
    ) -> Result<Option<Balance>, LookupError> {
        match self {
            Self::Memory(data) => data.find_by_account_and_asset(account_id, asset).await,
            Self::Turso(repo) => repo.find_by_account_and_asset(account_id, asset).await,
        }
    }
}

#[async_trait]
impl OrderQueuePort for DispatchQueue {
    async fn publish(&self, order: &Order) -> Result<(), QueueError> {
        match self {
            Self::Channel(queue) => queue.publish(order).await,
            Self::Nats(queue) => queue.publish(order).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_string;
    use crate::domain::shared::Amount;

    fn memory_config() -> Config {
        load_config_from_string(
            r"
persistence:
  backend: memory
queue:
  backend: memory
",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn builds_memory_backends() {
        let container = Container::from_config(memory_config()).await.unwrap();

        assert!(matches!(*container.orders(), OrderStore::Memory(_)));
        assert!(matches!(*container.reference(), ReferenceStore::Memory(_)));
    }

    #[tokio::test]
    async fn builds_turso_backend_in_memory_database() {
        let mut config = memory_config();
        config.persistence.backend = PersistenceBackend::Turso;
        config.persistence.db_path = ":memory:".to_string();

        let container = Container::from_config(config).await.unwrap();

        assert!(matches!(*container.orders(), OrderStore::Turso(_)));
        assert!(container.orders().list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn wired_use_cases_share_storage() {
        let container = Container::from_config(memory_config()).await.unwrap();
        let ReferenceStore::Memory(data) = &*container.reference() else {
            panic!("expected memory reference data");
        };
        data.add_account(Account {
            id: AccountId::new("A1"),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
        });
        data.add_instrument(Instrument {
            id: InstrumentId::new("I1"),
            base_asset: Asset::new("BTC"),
            quote_asset: Asset::new("USD"),
        });
        data.set_balance(AccountId::new("A1"), Asset::new("USD"), Amount::from(1000u32));

        let ctx = crate::application::context::RequestContext::background();
        let id = container
            .place_order_use_case()
            .execute(
                &ctx,
                crate::application::dto::PlaceOrderRequest::new("A1", "I1", "BUY", "100", "5"),
            )
            .await
            .unwrap();

        let stored = container.query_orders_use_case().find_by_id(&id).await.unwrap();
        assert_eq!(stored.id, id.to_string());

        let report = container.relay_outbox_use_case().run_once().await.unwrap();
        assert_eq!(report.scanned, 0);
    }
}
