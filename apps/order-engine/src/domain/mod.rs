//! Domain Layer
//!
//! Business rules with no infrastructure dependencies:
//!
//! - **Aggregates**: consistency boundaries with invariants
//! - **Value Objects**: immutable types compared by value
//! - **Domain Services**: stateless rules spanning several types
//! - **Repository Traits**: persistence abstractions implemented by adapters
//!
//! # Bounded Contexts
//!
//! - [`order_management`]: order lifecycle and dispatch state
//! - [`reference`]: accounts, instruments and balances read from elsewhere

pub mod order_management;
pub mod reference;
pub mod shared;
