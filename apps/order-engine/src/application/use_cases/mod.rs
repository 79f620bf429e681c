//! Application Use Cases
//!
//! Use cases orchestrate domain logic to fulfill application requirements.

mod cancel_order;
mod place_order;
mod query_orders;
mod relay_outbox;
mod update_order_status;

pub use cancel_order::CancelOrderUseCase;
pub use place_order::{PlaceOrderConfig, PlaceOrderUseCase};
pub use query_orders::{DEFAULT_UNDISPATCHED_LIMIT, QueryOrdersUseCase};
pub use relay_outbox::{RelayOutboxUseCase, RelayReport};
pub use update_order_status::UpdateOrderStatusUseCase;
