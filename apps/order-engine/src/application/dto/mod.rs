//! Data Transfer Objects (DTOs)
//!
//! Shapes crossing the API and queue boundaries.

mod order_dto;

pub use order_dto::{OrderDispatchMessage, OrderDto, PlaceOrderRequest, UpdateOrderStatusRequest};
