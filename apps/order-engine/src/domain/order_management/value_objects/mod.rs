//! Order management value objects.

mod dispatch_state;
mod order_side;
mod order_status;

pub use dispatch_state::{DispatchState, DispatchStatus};
pub use order_side::{OrderSide, UnknownSide};
pub use order_status::{OrderStatus, UnknownStatus};
