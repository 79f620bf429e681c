//! Order Aggregate

mod order;

pub use order::{
    CancelOutcome, NewOrder, Order, OrderVersion, PRICE_SCALE, QUANTITY_SCALE,
    ReconstitutedOrderParams,
};
