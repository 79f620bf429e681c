//! Order DTOs

use serde::{Deserialize, Serialize};

use crate::domain::order_management::{DispatchStatus, Order, OrderSide, OrderStatus};
use crate::domain::shared::{Amount, Timestamp};

/// Raw order placement request as received on the wire.
///
/// Every field is optional here so that missing or mistyped values are
/// reported by validation as `InvalidInput` rather than by the decoder.
/// `price` and `quantity` accept a JSON string or a JSON number.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    /// Owning account.
    #[serde(default)]
    pub account_id: Option<String>,
    /// Instrument to trade.
    #[serde(default)]
    pub instrument_id: Option<String>,
    /// `BUY` or `SELL`.
    #[serde(default, rename = "type")]
    pub side: Option<String>,
    /// Limit price.
    #[serde(default)]
    pub price: Option<serde_json::Value>,
    /// Quantity.
    #[serde(default)]
    pub quantity: Option<serde_json::Value>,
}

impl PlaceOrderRequest {
    /// Convenience constructor with string amounts.
    #[must_use]
    pub fn new(
        account_id: &str,
        instrument_id: &str,
        side: &str,
        price: &str,
        quantity: &str,
    ) -> Self {
        Self {
            account_id: Some(account_id.to_string()),
            instrument_id: Some(instrument_id.to_string()),
            side: Some(side.to_string()),
            price: Some(serde_json::Value::String(price.to_string())),
            quantity: Some(serde_json::Value::String(quantity.to_string())),
        }
    }
}

/// Execution progress reported for a stored order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
    /// Target status.
    #[serde(default)]
    pub status: Option<String>,
    /// Remaining quantity after the update.
    #[serde(default)]
    pub remaining_quantity: Option<serde_json::Value>,
}

/// Order as exposed to API clients and the dispatch queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDto {
    /// Order id.
    pub id: String,
    /// Owning account.
    pub account_id: String,
    /// Instrument traded.
    pub instrument_id: String,
    /// BUY or SELL.
    #[serde(rename = "type")]
    pub side: OrderSide,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Limit price.
    pub price: Amount,
    /// Original quantity.
    pub quantity: Amount,
    /// Quantity not yet executed.
    pub remaining_quantity: Amount,
    /// Outbox status.
    pub dispatch_status: DispatchStatus,
    /// Delivery rounds attempted.
    pub dispatch_attempts: u32,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last modification time.
    pub updated_at: Timestamp,
}

impl OrderDto {
    /// Project an order.
    #[must_use]
    pub fn from_order(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            account_id: order.account_id().to_string(),
            instrument_id: order.instrument_id().to_string(),
            side: order.side(),
            status: order.status(),
            price: order.price(),
            quantity: order.quantity(),
            remaining_quantity: order.remaining_quantity(),
            dispatch_status: order.dispatch().status,
            dispatch_attempts: order.dispatch().attempts,
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        }
    }
}

impl From<&Order> for OrderDto {
    fn from(order: &Order) -> Self {
        Self::from_order(order)
    }
}

/// Message handed to downstream processing for each placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDispatchMessage {
    /// Order id; consumers de-duplicate on it.
    pub id: String,
    /// Owning account.
    pub account_id: String,
    /// Instrument traded.
    pub instrument_id: String,
    /// BUY or SELL.
    #[serde(rename = "type")]
    pub side: OrderSide,
    /// Status at dispatch time.
    pub status: OrderStatus,
    /// Limit price.
    pub price: Amount,
    /// Original quantity.
    pub quantity: Amount,
    /// Quantity not yet executed.
    pub remaining_quantity: Amount,
    /// Creation time.
    pub created_at: Timestamp,
}

impl From<&Order> for OrderDispatchMessage {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            account_id: order.account_id().to_string(),
            instrument_id: order.instrument_id().to_string(),
            side: order.side(),
            status: order.status(),
            price: order.price(),
            quantity: order.quantity(),
            remaining_quantity: order.remaining_quantity(),
            created_at: order.created_at(),
        }
    }
}
