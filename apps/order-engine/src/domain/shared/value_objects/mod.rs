//! Shared Value Objects
//!
//! Immutable domain types used across bounded contexts.

mod amount;
mod identifiers;
mod notional;
mod timestamp;

pub use amount::{Amount, AmountError};
pub use identifiers::{AccountId, Asset, InstrumentId, OrderId};
pub use notional::Notional;
pub use timestamp::Timestamp;
