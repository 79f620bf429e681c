//! Exact wide decimal for funds arithmetic.
//!
//! Prices and quantities fit an [`Amount`], but their products and the
//! sums of several products do not always: a 10-digit price fraction
//! times an 18-digit quantity fraction already needs 28 fractional
//! digits before the integer part is counted. A `Notional` keeps an
//! unbounded integer significand with a base-10 scale, so multiplication,
//! addition and subtraction are exact and comparison never rounds.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

use num_bigint::BigInt;
use num_traits::{Signed, Zero};

use super::Amount;

/// Exact signed decimal: `digits × 10^-scale`.
///
/// Equality and ordering are numeric, so `1.50 == 1.5`.
#[derive(Debug, Clone)]
pub struct Notional {
    digits: BigInt,
    scale: u32,
}

impl Notional {
    /// Zero.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            digits: BigInt::zero(),
            scale: 0,
        }
    }

    /// Exact `price × quantity`.
    #[must_use]
    pub fn product(price: Amount, quantity: Amount) -> Self {
        let price = Self::from(price);
        let quantity = Self::from(quantity);
        Self {
            digits: price.digits * quantity.digits,
            scale: price.scale + quantity.scale,
        }
    }

    /// True when strictly below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.digits.is_negative()
    }

    /// Zero when negative, otherwise unchanged.
    #[must_use]
    pub fn clamp_at_zero(self) -> Self {
        if self.is_negative() { Self::zero() } else { self }
    }

    fn rescaled(&self, scale: u32) -> BigInt {
        let shift = (scale - self.scale) as usize;
        &self.digits * num_traits::pow(BigInt::from(10u32), shift)
    }

    // Both significands at the larger of the two scales.
    fn aligned(&self, other: &Self) -> (BigInt, BigInt, u32) {
        let scale = self.scale.max(other.scale);
        (self.rescaled(scale), other.rescaled(scale), scale)
    }

    fn normalized(&self) -> (BigInt, u32) {
        let ten = BigInt::from(10u32);
        let mut digits = self.digits.clone();
        let mut scale = self.scale;
        while scale > 0 && (&digits % &ten).is_zero() {
            digits = &digits / &ten;
            scale -= 1;
        }
        (digits, scale)
    }
}

impl Default for Notional {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<Amount> for Notional {
    fn from(amount: Amount) -> Self {
        let decimal = amount.as_decimal();
        Self {
            digits: BigInt::from(decimal.mantissa()),
            scale: decimal.scale(),
        }
    }
}

impl From<u32> for Notional {
    fn from(value: u32) -> Self {
        Self {
            digits: BigInt::from(value),
            scale: 0,
        }
    }
}

impl Add for Notional {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let (lhs, rhs, scale) = self.aligned(&rhs);
        Self {
            digits: lhs + rhs,
            scale,
        }
    }
}

impl Sub for Notional {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        let (lhs, rhs, scale) = self.aligned(&rhs);
        Self {
            digits: lhs - rhs,
            scale,
        }
    }
}

impl PartialEq for Notional {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Notional {}

impl PartialOrd for Notional {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Notional {
    fn cmp(&self, other: &Self) -> Ordering {
        let (lhs, rhs, _) = self.aligned(other);
        lhs.cmp(&rhs)
    }
}

impl PartialEq<Amount> for Notional {
    fn eq(&self, other: &Amount) -> bool {
        *self == Self::from(*other)
    }
}

impl fmt::Display for Notional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (digits, scale) = self.normalized();
        let sign = if digits.is_negative() { "-" } else { "" };
        let text = digits.abs().to_string();
        let scale = scale as usize;

        if scale == 0 {
            write!(f, "{sign}{text}")
        } else if text.len() > scale {
            let (int_part, frac_part) = text.split_at(text.len() - scale);
            write!(f, "{sign}{int_part}.{frac_part}")
        } else {
            write!(f, "{sign}0.{}{text}", "0".repeat(scale - text.len()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn amount(s: &str) -> Amount {
        Amount::parse(s).unwrap()
    }

    #[test]
    fn product_is_exact_beyond_amount_precision() {
        let notional = Notional::product(amount("3500.1234567891"), amount("0.123456789012345678"));
        assert_eq!(notional.to_string(), "432.1140031219739333576651425098");
    }

    #[test]
    fn product_of_simple_values() {
        assert_eq!(Notional::product(amount("0.1"), amount("3")), amount("0.3"));
        assert_eq!(Notional::product(amount("100"), amount("5")), amount("500"));
    }

    #[test]
    fn product_keeps_smallest_units() {
        let notional = Notional::product(amount("0.0000000001"), amount("0.000000000000000001"));
        assert_eq!(notional.to_string(), format!("0.{}1", "0".repeat(27)));
        assert!(notional > Notional::zero());
    }

    #[test]
    fn product_of_large_values_does_not_overflow() {
        let huge = amount("79228162514264337593543950335");
        let notional = Notional::product(huge, huge);
        assert!(notional > Notional::from(huge));
    }

    #[test]
    fn comparison_ignores_scale() {
        assert_eq!(Notional::from(amount("1.50")), Notional::from(amount("1.5")));
        assert!(Notional::from(amount("2")) > Notional::from(amount("1.999999999")));
        assert_eq!(Notional::from(400u32), amount("400"));
    }

    #[test]
    fn subtraction_can_go_negative() {
        let diff = Notional::from(amount("1")) - Notional::from(amount("1.25"));
        assert!(diff.is_negative());
        assert_eq!(diff.to_string(), "-0.25");
        assert_eq!(diff.clamp_at_zero(), Notional::zero());
    }

    #[test]
    fn one_unit_short_is_smaller() {
        let required = Notional::product(amount("3500.1234567891"), amount("0.123456789012345678"));
        let short = required.clone() - Notional::product(amount("0.0000000001"), amount("0.000000000000000001"));
        assert!(short < required);
    }

    proptest! {
        #[test]
        fn sums_match_integer_math(a in 0u32..1_000_000, b in 0u32..1_000_000) {
            let sum = Notional::from(a) + Notional::from(b);
            prop_assert_eq!(sum.to_string(), (u64::from(a) + u64::from(b)).to_string());
        }
    }
}
