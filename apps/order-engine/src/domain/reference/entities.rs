//! Read-only reference entities.

use serde::{Deserialize, Serialize};

use crate::domain::shared::{AccountId, Amount, Asset, InstrumentId};

/// A trading account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account id.
    pub id: AccountId,
    /// Display name.
    pub name: String,
    /// Contact address.
    pub email: String,
}

/// A tradable pair such as BTC/USD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// Instrument id.
    pub id: InstrumentId,
    /// Asset being bought or sold.
    pub base_asset: Asset,
    /// Asset prices are quoted in.
    pub quote_asset: Asset,
}

/// Holdings of one asset in one account at the time of the read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Owning account.
    pub account_id: AccountId,
    /// Asset held.
    pub asset: Asset,
    /// Quantity held.
    pub amount: Amount,
}
