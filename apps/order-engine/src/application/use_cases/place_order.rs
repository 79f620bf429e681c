//! Place Order Use Case
//!
//! Validates a placement request, checks the account can fund it, stores
//! the order together with its outbox entry, and hands it to the dispatch
//! queue.
//!
//! Everything up to the storage write honours the caller's
//! [`RequestContext`]. The write and the dispatch that follows run in a
//! spawned task, so once an order is stored it is always either delivered
//! or left pending for the relay, even if the caller goes away.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::application::context::RequestContext;
use crate::application::dto::PlaceOrderRequest;
use crate::application::errors::{EngineError, Resource};
use crate::application::ports::{
    AccountRepository, BalanceRepository, InstrumentRepository, OrderQueuePort, OrderRepository,
};
use crate::application::services::{
    BalanceCheck, DispatchOutcome, OrderDispatcher, ReservationGuard, ReservationLocks,
};
use crate::application::validation::{self, ValidatedOrder};
use crate::domain::order_management::services::{
    SettlementRequirement, committed_by, settlement_requirement,
};
use crate::domain::order_management::{NewOrder, OrderSide};
use crate::domain::reference::Instrument;
use crate::domain::shared::{AccountId, Asset, InstrumentId, Notional, OrderId};
use crate::observability;
use crate::resilience::RetryPolicy;

/// Placement settings.
#[derive(Debug, Clone, Default)]
pub struct PlaceOrderConfig {
    /// Retry policy for the inline publish.
    pub dispatch_retry: RetryPolicy,
    /// Serialize placements per (account, settlement asset) and count the
    /// account's open orders against its balance. An open order whose
    /// instrument cannot be resolved blocks new placements for the account.
    pub reserve_open_orders: bool,
}

/// Use case for placing a single order.
pub struct PlaceOrderUseCase<A, I, B, O, Q>
where
    A: AccountRepository,
    I: InstrumentRepository,
    B: BalanceRepository,
    O: OrderRepository + 'static,
    Q: OrderQueuePort + 'static,
{
    accounts: Arc<A>,
    instruments: Arc<I>,
    balances: BalanceCheck<B>,
    orders: Arc<O>,
    dispatcher: Arc<OrderDispatcher<O, Q>>,
    reservations: Option<ReservationLocks>,
}

impl<A, I, B, O, Q> PlaceOrderUseCase<A, I, B, O, Q>
where
    A: AccountRepository,
    I: InstrumentRepository,
    B: BalanceRepository,
    O: OrderRepository + 'static,
    Q: OrderQueuePort + 'static,
{
    /// Create a new PlaceOrderUseCase.
    pub fn new(
        accounts: Arc<A>,
        instruments: Arc<I>,
        balances: Arc<B>,
        orders: Arc<O>,
        queue: Arc<Q>,
        config: PlaceOrderConfig,
    ) -> Self {
        let dispatcher = OrderDispatcher::new(Arc::clone(&orders), queue, config.dispatch_retry);
        Self {
            accounts,
            instruments,
            balances: BalanceCheck::new(balances),
            orders,
            dispatcher: Arc::new(dispatcher),
            reservations: config.reserve_open_orders.then(ReservationLocks::new),
        }
    }

    /// Execute the use case.
    ///
    /// Returns the id of the stored and dispatched order.
    ///
    /// # Errors
    ///
    /// - `InvalidInput`, `NotFound`, `InsufficientFunds`: rejected, nothing stored
    /// - `InvalidState`: with reservation on, an open order of the account
    ///   references an unknown instrument
    /// - `Cancelled`, `DeadlineExceeded`: the caller gave up before the write
    /// - `DispatchFailed`: stored, but the queue did not take it; do not retry
    /// - `Repository`, `Lookup`, `Task`: infrastructure failure
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        request: PlaceOrderRequest,
    ) -> Result<OrderId, EngineError> {
        let started = Instant::now();
        let result = self.place(ctx, &request).await;

        let side = request
            .side
            .as_deref()
            .and_then(|s| s.trim().parse::<OrderSide>().ok())
            .map_or("UNKNOWN", |side| side.as_str());
        let outcome = match &result {
            Ok(_) => "placed",
            Err(e) => e.kind().code(),
        };
        observability::record_order_placement(side, outcome, started.elapsed().as_secs_f64());

        match &result {
            Ok(order_id) => tracing::info!(order_id = %order_id, side, "Order placed"),
            Err(e) if e.kind().is_rejection() => {
                tracing::info!(error = %e, code = e.kind().code(), "Order rejected");
            }
            Err(e) => tracing::warn!(error = %e, code = e.kind().code(), "Order placement failed"),
        }

        result
    }

    async fn place(
        &self,
        ctx: &RequestContext,
        request: &PlaceOrderRequest,
    ) -> Result<OrderId, EngineError> {
        let order = validation::validate(request)?;
        let draft = NewOrder::new(
            order.account_id.clone(),
            order.instrument_id.clone(),
            order.side,
            order.price,
            order.quantity,
        )?;

        let requirement = ctx.run(self.resolve_requirement(&order)).await?;

        let reservation = match &self.reservations {
            Some(locks) => Some(
                ctx.run(async {
                    Ok::<ReservationGuard, EngineError>(
                        locks.acquire(&order.account_id, &requirement.asset).await,
                    )
                })
                .await?,
            ),
            None => None,
        };

        let committed = if reservation.is_some() {
            ctx.run(self.committed_amount(&order.account_id, &requirement.asset))
                .await?
        } else {
            Notional::zero()
        };

        ctx.run(
            self.balances
                .ensure_sufficient(&order.account_id, &requirement, committed),
        )
        .await?;

        // Last exit before the write.
        ctx.check()?;

        let orders = Arc::clone(&self.orders);
        let dispatcher = Arc::clone(&self.dispatcher);
        let task = tokio::spawn(async move {
            let stored = orders.create(&draft).await;
            drop(reservation);
            let stored = stored?;
            tracing::debug!(
                order_id = %stored.id(),
                account_id = %stored.account_id(),
                "Order stored with pending dispatch"
            );
            let outcome = dispatcher.dispatch(&stored).await;
            Ok::<_, EngineError>((stored.id().clone(), outcome))
        });

        let (order_id, outcome) = task
            .await
            .map_err(|e| EngineError::Task(e.to_string()))??;

        match outcome {
            DispatchOutcome::Delivered { .. } => Ok(order_id),
            DispatchOutcome::Pending { reason, .. } => {
                Err(EngineError::DispatchFailed { order_id, reason })
            }
        }
    }

    async fn resolve_requirement(
        &self,
        order: &ValidatedOrder,
    ) -> Result<SettlementRequirement, EngineError> {
        self.accounts
            .find_by_id(&order.account_id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                resource: Resource::Account,
                id: order.account_id.to_string(),
            })?;

        let instrument = self
            .instruments
            .find_by_id(&order.instrument_id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                resource: Resource::Instrument,
                id: order.instrument_id.to_string(),
            })?;

        Ok(settlement_requirement(
            order.side,
            order.price,
            order.quantity,
            &instrument,
        ))
    }

    /// Sum of what the account's open orders still hold in `asset`.
    ///
    /// An open order whose instrument no longer resolves settles in an
    /// unknown asset, so its hold cannot be priced; placement is refused
    /// until the instrument is restored or the order is closed.
    async fn committed_amount(
        &self,
        account_id: &AccountId,
        asset: &Asset,
    ) -> Result<Notional, EngineError> {
        let open = self.orders.list_open_by_account(account_id).await?;
        let mut instruments: HashMap<InstrumentId, Option<Instrument>> = HashMap::new();
        let mut committed = Notional::zero();

        for order in &open {
            let instrument = match instruments.get(order.instrument_id()) {
                Some(found) => found.clone(),
                None => {
                    let found = self.instruments.find_by_id(order.instrument_id()).await?;
                    instruments.insert(order.instrument_id().clone(), found.clone());
                    found
                }
            };
            let Some(instrument) = instrument else {
                tracing::warn!(
                    order_id = %order.id(),
                    instrument_id = %order.instrument_id(),
                    "Open order references unknown instrument; refusing placement"
                );
                return Err(EngineError::InvalidState(format!(
                    "open order {} references unknown instrument {}; committed funds of {account_id} cannot be determined",
                    order.id(),
                    order.instrument_id()
                )));
            };

            if let Some(held) = committed_by(order, &instrument) {
                if held.asset == *asset {
                    committed = committed + held.amount;
                }
            }
        }

        Ok(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::errors::ErrorKind;
    use crate::domain::reference::{Account, LookupError};
    use crate::domain::shared::Amount;
    use crate::infrastructure::messaging::{ChannelOrderQueue, FlakyOrderQueue};
    use crate::infrastructure::persistence::{InMemoryOrderRepository, InMemoryReferenceData};
    use async_trait::async_trait;
    use std::time::Duration;

    fn reference_data() -> Arc<InMemoryReferenceData> {
        let data = InMemoryReferenceData::new();
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
        data.set_balance(
            AccountId::new("A1"),
            Asset::new("USD"),
            Amount::from(1000u32),
        );
        data.set_balance(AccountId::new("A1"), Asset::new("BTC"), Amount::from(2u32));
        Arc::new(data)
    }

    type TestUseCase<Q> = PlaceOrderUseCase<
        InMemoryReferenceData,
        InMemoryReferenceData,
        InMemoryReferenceData,
        InMemoryOrderRepository,
        Q,
    >;

    fn use_case<Q: OrderQueuePort + 'static>(
        orders: &Arc<InMemoryOrderRepository>,
        queue: Arc<Q>,
        config: PlaceOrderConfig,
    ) -> TestUseCase<Q> {
        let data = reference_data();
        PlaceOrderUseCase::new(
            Arc::clone(&data),
            Arc::clone(&data),
            data,
            Arc::clone(orders),
            queue,
            config,
        )
    }

    #[tokio::test]
    async fn places_and_dispatches_order() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let (queue, mut rx) = ChannelOrderQueue::bounded(64);
        let uc = use_case(&orders, Arc::new(queue), PlaceOrderConfig::default());

        let id = uc
            .execute(
                &RequestContext::background(),
                PlaceOrderRequest::new("A1", "I1", "BUY", "100", "5"),
            )
            .await
            .unwrap();

        let stored = orders.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.remaining_quantity(), stored.quantity());
        assert!(stored.dispatch().is_dispatched());
        assert_eq!(rx.recv().await.unwrap().id, id.to_string());
    }

    #[tokio::test]
    async fn sell_spends_base_asset() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let (queue, _rx) = ChannelOrderQueue::bounded(64);
        let uc = use_case(&orders, Arc::new(queue), PlaceOrderConfig::default());
        let ctx = RequestContext::background();

        // Price is irrelevant for SELL: 2 BTC held.
        assert!(
            uc.execute(&ctx, PlaceOrderRequest::new("A1", "I1", "SELL", "90000", "2"))
                .await
                .is_ok()
        );
        let err = uc
            .execute(&ctx, PlaceOrderRequest::new("A1", "I1", "SELL", "1", "2.5"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientFunds { ref asset, .. } if asset.as_str() == "BTC"));
    }

    #[tokio::test]
    async fn unknown_references_are_not_found() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let (queue, _rx) = ChannelOrderQueue::bounded(64);
        let uc = use_case(&orders, Arc::new(queue), PlaceOrderConfig::default());
        let ctx = RequestContext::background();

        let err = uc
            .execute(&ctx, PlaceOrderRequest::new("A9", "I1", "BUY", "1", "1"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "account not found");

        let err = uc
            .execute(&ctx, PlaceOrderRequest::new("A1", "I9", "BUY", "1", "1"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "instrument not found");

        assert!(orders.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dispatch_failure_returns_stored_id() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let queue = Arc::new(FlakyOrderQueue::always_failing());
        let config = PlaceOrderConfig {
            dispatch_retry: RetryPolicy::immediate(2),
            ..PlaceOrderConfig::default()
        };
        let uc = use_case(&orders, queue, config);

        let err = uc
            .execute(
                &RequestContext::background(),
                PlaceOrderRequest::new("A1", "I1", "BUY", "100", "5"),
            )
            .await
            .unwrap_err();

        let order_id = err.order_id().cloned().unwrap();
        let pending = orders.list_undispatched(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id(), &order_id);
    }

    #[tokio::test]
    async fn cancelled_context_stores_nothing() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let (queue, _rx) = ChannelOrderQueue::bounded(64);
        let uc = use_case(&orders, Arc::new(queue), PlaceOrderConfig::default());

        let ctx = RequestContext::background();
        ctx.cancellation_token().cancel();

        let err = uc
            .execute(&ctx, PlaceOrderRequest::new("A1", "I1", "BUY", "100", "5"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
        assert!(orders.list_all().await.unwrap().is_empty());
    }

    struct SlowAccounts;

    #[async_trait]
    impl AccountRepository for SlowAccounts {
        async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, LookupError> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(Some(Account {
                id: id.clone(),
                name: String::new(),
                email: String::new(),
            }))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_during_lookup_stores_nothing() {
        let data = reference_data();
        let orders = Arc::new(InMemoryOrderRepository::new());
        let (queue, _rx) = ChannelOrderQueue::bounded(64);
        let uc = PlaceOrderUseCase::new(
            Arc::new(SlowAccounts),
            Arc::clone(&data),
            data,
            Arc::clone(&orders),
            Arc::new(queue),
            PlaceOrderConfig::default(),
        );

        let ctx = RequestContext::with_timeout(Duration::from_millis(100));
        let err = uc
            .execute(&ctx, PlaceOrderRequest::new("A1", "I1", "BUY", "100", "5"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::DeadlineExceeded));
        assert!(orders.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reservation_counts_open_orders() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let (queue, _rx) = ChannelOrderQueue::bounded(64);
        let config = PlaceOrderConfig {
            reserve_open_orders: true,
            ..PlaceOrderConfig::default()
        };
        let uc = use_case(&orders, Arc::new(queue), config);
        let ctx = RequestContext::background();

        uc.execute(&ctx, PlaceOrderRequest::new("A1", "I1", "BUY", "100", "6"))
            .await
            .unwrap();
        let err = uc
            .execute(&ctx, PlaceOrderRequest::new("A1", "I1", "BUY", "100", "5"))
            .await
            .unwrap_err();

        match err {
            EngineError::InsufficientFunds { available, .. } => {
                assert_eq!(available, Notional::from(400u32));
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn without_reservation_open_orders_are_ignored() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let (queue, _rx) = ChannelOrderQueue::bounded(64);
        let uc = use_case(&orders, Arc::new(queue), PlaceOrderConfig::default());
        let ctx = RequestContext::background();

        for _ in 0..2 {
            uc.execute(&ctx, PlaceOrderRequest::new("A1", "I1", "BUY", "100", "6"))
                .await
                .unwrap();
        }
        assert_eq!(orders.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn buy_notional_beyond_storage_precision_is_placed() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let (queue, _rx) = ChannelOrderQueue::bounded(64);
        let uc = use_case(&orders, Arc::new(queue), PlaceOrderConfig::default());

        let id = uc
            .execute(
                &RequestContext::background(),
                PlaceOrderRequest::new(
                    "A1",
                    "I1",
                    "BUY",
                    "3500.1234567891",
                    "0.123456789012345678",
                ),
            )
            .await
            .unwrap();

        let stored = orders.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.price(), Amount::parse("3500.1234567891").unwrap());
        assert_eq!(
            stored.quantity(),
            Amount::parse("0.123456789012345678").unwrap()
        );
    }

    #[tokio::test]
    async fn reservation_refuses_when_open_order_instrument_is_unknown() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let orphan = NewOrder::new(
            AccountId::new("A1"),
            InstrumentId::new("I-delisted"),
            OrderSide::Buy,
            Amount::from(1u32),
            Amount::from(1u32),
        )
        .unwrap();
        orders.create(&orphan).await.unwrap();

        let (queue, _rx) = ChannelOrderQueue::bounded(64);
        let config = PlaceOrderConfig {
            reserve_open_orders: true,
            ..PlaceOrderConfig::default()
        };
        let uc = use_case(&orders, Arc::new(queue), config);

        let err = uc
            .execute(
                &RequestContext::background(),
                PlaceOrderRequest::new("A1", "I1", "BUY", "1", "1"),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(err.to_string().contains("I-delisted"));
        assert_eq!(orders.len(), 1);
    }
}
