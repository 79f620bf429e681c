//! Direction of an order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// BUY spends the quote asset, SELL spends the base asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    /// Acquire the base asset, paying in the quote asset.
    Buy,
    /// Give up the base asset.
    Sell,
}

impl OrderSide {
    /// Wire and storage spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when text is neither `BUY` nor `SELL`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order side '{0}', expected BUY or SELL")]
pub struct UnknownSide(pub String);

impl FromStr for OrderSide {
    type Err = UnknownSide;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            other => Err(UnknownSide(other.to_string())),
        }
    }
}
