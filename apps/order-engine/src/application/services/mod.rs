//! Application Services
//!
//! Building blocks shared by the use cases: the balance sufficiency check,
//! per-account placement locks, queue dispatch with outbox bookkeeping,
//! and conditional status writes.

mod balance_check;
mod dispatcher;
mod order_update;
mod reservation;

pub use balance_check::BalanceCheck;
pub use dispatcher::{DispatchOutcome, OrderDispatcher};
pub use order_update::{AppliedUpdate, MAX_UPDATE_ATTEMPTS, apply_order_update};
pub use reservation::{ReservationGuard, ReservationLocks};
