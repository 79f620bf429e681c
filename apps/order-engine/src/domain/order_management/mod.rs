//! Order Management Bounded Context
//!
//! Order lifecycle from placement to a terminal status, plus the outbox
//! state that tracks delivery to the dispatch queue.

pub mod aggregate;
pub mod errors;
pub mod repository;
pub mod services;
pub mod value_objects;

pub use aggregate::{
    CancelOutcome, NewOrder, Order, OrderVersion, PRICE_SCALE, QUANTITY_SCALE,
    ReconstitutedOrderParams,
};
pub use errors::{OrderError, RepositoryError};
pub use repository::OrderRepository;
pub use value_objects::{DispatchState, DispatchStatus, OrderSide, OrderStatus};
