//! Exact decimal amount used for prices, quantities and balances.
//!
//! An `Amount` holds what arrives on the wire and what is stored: prices,
//! quantities and balances. Funds arithmetic that can outgrow it runs on
//! [`Notional`](super::Notional). On the wire an `Amount` is written as a JSON string and read from
//! either a JSON string or a JSON number.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error produced when text cannot be read as an [`Amount`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// Input was empty or whitespace.
    #[error("amount is empty")]
    Empty,
    /// Input is not a finite base-10 number.
    #[error("'{0}' is not a decimal number")]
    NotANumber(String),
    /// Input has more significant digits than can be held exactly.
    #[error("'{0}' exceeds the supported decimal precision")]
    OutOfRange(String),
}

/// Exact signed base-10 number.
///
/// Equality and ordering are numeric, so `1.50 == 1.5`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Amount(Decimal);

impl Amount {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a `Decimal`.
    #[must_use]
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Parse a plain or scientific decimal literal.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError`] for empty, non-numeric or over-precise text.
    pub fn parse(input: &str) -> Result<Self, AmountError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AmountError::Empty);
        }
        if !trimmed
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
        {
            return Err(AmountError::NotANumber(trimmed.to_string()));
        }

        let parsed = if trimmed.contains(['e', 'E']) {
            Decimal::from_scientific(trimmed)
        } else {
            Decimal::from_str_exact(strip_trailing_zeros(trimmed))
        };

        parsed.map(Self).map_err(|e| classify(trimmed, &e))
    }

    /// The wrapped `Decimal`.
    #[must_use]
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// True when strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// True when exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Number of significant digits after the decimal point.
    ///
    /// Trailing zeros do not count: `1.2500` has two.
    #[must_use]
    pub fn fractional_digits(&self) -> u32 {
        self.0.normalize().scale()
    }

    /// Fixed-point text with exactly `dp` fractional digits.
    ///
    /// Extra digits are rounded half-to-even; missing digits are padded
    /// with zeros. Values with at most `dp` fractional digits come back
    /// unchanged through [`Amount::parse`].
    #[must_use]
    pub fn format_fixed(&self, dp: u32) -> String {
        let rounded = self
            .0
            .round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven);
        let text = rounded.to_string();
        let current = rounded.scale();
        if dp == 0 || current == dp {
            return text;
        }

        let missing = (dp - current) as usize;
        let mut out = String::with_capacity(text.len() + missing + 1);
        out.push_str(&text);
        if current == 0 {
            out.push('.');
        }
        out.extend(std::iter::repeat_n('0', missing));
        out
    }
}

// Trailing fractional zeros carry no value; dropping them keeps padded
// fixed-point text within the significand.
fn strip_trailing_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

fn classify(input: &str, err: &rust_decimal::Error) -> AmountError {
    match err {
        rust_decimal::Error::ExceedsMaximumPossibleValue
        | rust_decimal::Error::LessThanMinimumPossibleValue
        | rust_decimal::Error::Underflow
        | rust_decimal::Error::ScaleExceedsMaximumPrecision(_) => {
            AmountError::OutOfRange(input.to_string())
        }
        _ => AmountError::NotANumber(input.to_string()),
    }
}

impl PartialEq for Amount {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Amount {}

impl PartialOrd for Amount {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Amount {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl std::hash::Hash for Amount {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.normalize().hash(state);
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<u32> for Amount {
    fn from(value: u32) -> Self {
        Self(Decimal::from(value))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}

struct AmountVisitor;

impl Visitor<'_> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal number as a JSON string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::parse(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        Ok(Amount(Decimal::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount(Decimal::from(v)))
    }

    // Go through the shortest round-trip text so 0.1 stays 0.1.
    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        if !v.is_finite() {
            return Err(E::custom(AmountError::NotANumber(v.to_string())));
        }
        Amount::parse(&v.to_string()).map_err(E::custom)
    }
}
