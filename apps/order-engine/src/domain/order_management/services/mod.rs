//! Order management domain services.

mod order_state_machine;
mod settlement;

pub use order_state_machine::OrderStateMachine;
pub use settlement::{SettlementRequirement, committed_by, settlement_requirement};
