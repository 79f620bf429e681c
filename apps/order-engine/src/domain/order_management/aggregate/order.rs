//! Order Aggregate Root
//!
//! An order is drafted as a [`NewOrder`], handed to the repository which
//! assigns its id and timestamps, and from then on lives as an [`Order`].

use crate::domain::order_management::errors::OrderError;
use crate::domain::order_management::services::OrderStateMachine;
use crate::domain::order_management::value_objects::{
    DispatchState, DispatchStatus, OrderSide, OrderStatus,
};
use crate::domain::shared::{AccountId, Amount, InstrumentId, OrderId, Timestamp};

/// Fractional digits kept for prices in storage.
pub const PRICE_SCALE: u32 = 10;

/// Fractional digits kept for quantities in storage.
pub const QUANTITY_SCALE: u32 = 18;

/// The execution state an update was computed from.
///
/// Repositories only apply an update while the stored order still has
/// this status and remaining quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderVersion {
    /// Status when read.
    pub status: OrderStatus,
    /// Remaining quantity when read.
    pub remaining_quantity: Amount,
}

/// An order that has passed its checks but has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    account_id: AccountId,
    instrument_id: InstrumentId,
    side: OrderSide,
    price: Amount,
    quantity: Amount,
}

impl NewOrder {
    /// Draft an order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameters` for blank ids or non-positive amounts.
    pub fn new(
        account_id: AccountId,
        instrument_id: InstrumentId,
        side: OrderSide,
        price: Amount,
        quantity: Amount,
    ) -> Result<Self, OrderError> {
        if account_id.is_blank() {
            return Err(invalid("account_id", "must not be empty"));
        }
        if instrument_id.is_blank() {
            return Err(invalid("instrument_id", "must not be empty"));
        }
        if !price.is_positive() {
            return Err(invalid("price", "must be greater than zero"));
        }
        if !quantity.is_positive() {
            return Err(invalid("quantity", "must be greater than zero"));
        }

        Ok(Self {
            account_id,
            instrument_id,
            side,
            price,
            quantity,
        })
    }

    /// Owning account.
    #[must_use]
    pub const fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    /// Instrument traded.
    #[must_use]
    pub const fn instrument_id(&self) -> &InstrumentId {
        &self.instrument_id
    }

    /// BUY or SELL.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Limit price in the quote asset.
    #[must_use]
    pub const fn price(&self) -> Amount {
        self.price
    }

    /// Quantity of the base asset.
    #[must_use]
    pub const fn quantity(&self) -> Amount {
        self.quantity
    }
}

fn invalid(field: &str, message: &str) -> OrderError {
    OrderError::InvalidParameters {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Parameters for rebuilding an [`Order`] from storage.
#[derive(Debug, Clone)]
pub struct ReconstitutedOrderParams {
    /// Storage-assigned id.
    pub id: OrderId,
    /// Owning account.
    pub account_id: AccountId,
    /// Instrument traded.
    pub instrument_id: InstrumentId,
    /// BUY or SELL.
    pub side: OrderSide,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Limit price.
    pub price: Amount,
    /// Original quantity.
    pub quantity: Amount,
    /// Quantity not yet executed.
    pub remaining_quantity: Amount,
    /// Outbox bookkeeping.
    pub dispatch: DispatchState,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last modification time.
    pub updated_at: Timestamp,
}

/// Result of [`Order::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The order moved to CANCELLED and must be written back.
    Cancelled,
    /// The order was already CANCELLED; nothing changed.
    AlreadyCancelled,
}

/// Order Aggregate Root.
///
/// Invariants held after every method:
/// - `remaining_quantity <= quantity`
/// - FILLED implies `remaining_quantity == 0`
/// - PARTIALLY_FILLED implies `0 < remaining_quantity < quantity`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    account_id: AccountId,
    instrument_id: InstrumentId,
    side: OrderSide,
    status: OrderStatus,
    price: Amount,
    quantity: Amount,
    remaining_quantity: Amount,
    dispatch: DispatchState,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Order {
    /// Materialize a draft under a storage-assigned id.
    ///
    /// The order starts OPEN with its full quantity remaining and a
    /// pending dispatch.
    #[must_use]
    pub fn from_new(id: OrderId, draft: NewOrder, now: Timestamp) -> Self {
        Self {
            id,
            account_id: draft.account_id,
            instrument_id: draft.instrument_id,
            side: draft.side,
            status: OrderStatus::Open,
            price: draft.price,
            quantity: draft.quantity,
            remaining_quantity: draft.quantity,
            dispatch: DispatchState::pending(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild from stored state.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` if the stored quantities contradict
    /// the stored status.
    pub fn reconstitute(params: ReconstitutedOrderParams) -> Result<Self, OrderError> {
        let order = Self {
            id: params.id,
            account_id: params.account_id,
            instrument_id: params.instrument_id,
            side: params.side,
            status: params.status,
            price: params.price,
            quantity: params.quantity,
            remaining_quantity: params.remaining_quantity,
            dispatch: params.dispatch,
            created_at: params.created_at,
            updated_at: params.updated_at,
        };
        order.check_invariants()?;
        Ok(order)
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Storage-assigned id.
    #[must_use]
    pub const fn id(&self) -> &OrderId {
        &self.id
    }

    /// Owning account.
    #[must_use]
    pub const fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    /// Instrument traded.
    #[must_use]
    pub const fn instrument_id(&self) -> &InstrumentId {
        &self.instrument_id
    }

    /// BUY or SELL.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Lifecycle status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Limit price.
    #[must_use]
    pub const fn price(&self) -> Amount {
        self.price
    }

    /// Original quantity.
    #[must_use]
    pub const fn quantity(&self) -> Amount {
        self.quantity
    }

    /// Quantity not yet executed.
    #[must_use]
    pub const fn remaining_quantity(&self) -> Amount {
        self.remaining_quantity
    }

    /// Current status and remaining quantity, for a conditional write.
    #[must_use]
    pub const fn version(&self) -> OrderVersion {
        OrderVersion {
            status: self.status,
            remaining_quantity: self.remaining_quantity,
        }
    }

    /// Outbox bookkeeping.
    #[must_use]
    pub const fn dispatch(&self) -> &DispatchState {
        &self.dispatch
    }

    /// Creation time.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Last modification time.
    #[must_use]
    pub const fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    // ========================================================================
    // State Transitions
    // ========================================================================

    /// Withdraw the order.
    ///
    /// Cancelling a CANCELLED order is a no-op. Remaining quantity is left
    /// as it was.
    ///
    /// # Errors
    ///
    /// Returns `CannotCancel` for a FILLED order.
    pub fn cancel(&mut self) -> Result<CancelOutcome, OrderError> {
        match self.status {
            OrderStatus::Cancelled => Ok(CancelOutcome::AlreadyCancelled),
            OrderStatus::Filled => Err(OrderError::CannotCancel {
                status: self.status,
            }),
            OrderStatus::Open | OrderStatus::PartiallyFilled => {
                self.status = OrderStatus::Cancelled;
                Ok(CancelOutcome::Cancelled)
            }
        }
    }

    /// Record execution progress reported by downstream processing.
    ///
    /// `remaining` is required for PARTIALLY_FILLED and must be zero (or
    /// omitted) for FILLED. Remaining quantity never grows.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` for edges outside the lifecycle,
    /// `InvariantViolation` when `remaining` is inconsistent with `status`.
    pub fn apply_execution(
        &mut self,
        status: OrderStatus,
        remaining: Option<Amount>,
    ) -> Result<(), OrderError> {
        OrderStateMachine::validate_transition(self.status, status)?;

        let remaining = match status {
            OrderStatus::Filled => remaining.unwrap_or(Amount::ZERO),
            OrderStatus::PartiallyFilled => remaining.ok_or_else(|| OrderError::InvariantViolation {
                invariant: "PARTIALLY_FILLED requires remaining quantity".to_string(),
                state: format!("quantity={}", self.quantity),
            })?,
            OrderStatus::Open | OrderStatus::Cancelled => {
                return Err(OrderError::InvalidStateTransition {
                    from: self.status,
                    to: status,
                });
            }
        };

        if remaining > self.remaining_quantity {
            return Err(OrderError::InvariantViolation {
                invariant: "remaining quantity cannot increase".to_string(),
                state: format!(
                    "remaining={} requested={remaining}",
                    self.remaining_quantity
                ),
            });
        }

        let candidate = Self {
            status,
            remaining_quantity: remaining,
            ..self.clone()
        };
        candidate.check_invariants()?;
        *self = candidate;
        Ok(())
    }

    /// Copy of this order carrying another write's status and remaining
    /// quantity. Used by stores that keep outbox state on the order row.
    #[must_use]
    pub fn with_progress(&self, status: OrderStatus, remaining_quantity: Amount) -> Self {
        Self {
            status,
            remaining_quantity,
            ..self.clone()
        }
    }

    /// Mark the order as acknowledged by the dispatch queue.
    pub fn mark_dispatched(&mut self) {
        self.dispatch.status = DispatchStatus::Dispatched;
        self.dispatch.attempts += 1;
        self.dispatch.last_error = None;
    }

    /// Record a failed publish attempt.
    pub fn record_dispatch_failure(&mut self, reason: impl Into<String>) {
        self.dispatch.attempts += 1;
        self.dispatch.last_error = Some(reason.into());
    }

    /// Stamp the modification time. Called by repositories on write.
    pub const fn touch(&mut self, at: Timestamp) {
        self.updated_at = at;
    }

    /// Verify quantity invariants against the current status.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` naming the broken rule.
    pub fn check_invariants(&self) -> Result<(), OrderError> {
        let violation = |invariant: &str| OrderError::InvariantViolation {
            invariant: invariant.to_string(),
            state: format!(
                "status={} quantity={} remaining={}",
                self.status, self.quantity, self.remaining_quantity
            ),
        };

        if self.remaining_quantity < Amount::ZERO {
            return Err(violation("remaining quantity must not be negative"));
        }
        if self.remaining_quantity > self.quantity {
            return Err(violation("remaining quantity must not exceed quantity"));
        }
        match self.status {
            OrderStatus::Filled if !self.remaining_quantity.is_zero() => {
                Err(violation("FILLED requires zero remaining quantity"))
            }
            OrderStatus::PartiallyFilled
                if self.remaining_quantity.is_zero()
                    || self.remaining_quantity == self.quantity =>
            {
                Err(violation(
                    "PARTIALLY_FILLED requires remaining strictly between zero and quantity",
                ))
            }
            _ => Ok(()),
        }
    }
}
