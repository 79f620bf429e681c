//! Settlement Requirement
//!
//! Which asset an order spends, and how much of it.

use crate::domain::order_management::aggregate::Order;
use crate::domain::order_management::value_objects::OrderSide;
use crate::domain::reference::Instrument;
use crate::domain::shared::{Amount, Asset, Notional};

/// Asset and amount an order needs from the account's balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementRequirement {
    /// Asset to be spent.
    pub asset: Asset,
    /// Exact amount of it.
    pub amount: Notional,
}

/// BUY spends `price × quantity` of the quote asset; SELL spends
/// `quantity` of the base asset.
#[must_use]
pub fn settlement_requirement(
    side: OrderSide,
    price: Amount,
    quantity: Amount,
    instrument: &Instrument,
) -> SettlementRequirement {
    match side {
        OrderSide::Buy => SettlementRequirement {
            asset: instrument.quote_asset.clone(),
            amount: Notional::product(price, quantity),
        },
        OrderSide::Sell => SettlementRequirement {
            asset: instrument.base_asset.clone(),
            amount: Notional::from(quantity),
        },
    }
}

/// Amount a stored order still holds against the account: the
/// requirement of its remaining quantity, or nothing once terminal.
#[must_use]
pub fn committed_by(order: &Order, instrument: &Instrument) -> Option<SettlementRequirement> {
    order.status().is_open().then(|| {
        settlement_requirement(
            order.side(),
            order.price(),
            order.remaining_quantity(),
            instrument,
        )
    })
}
