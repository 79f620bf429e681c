//! Order Request Validation
//!
//! Field rules for a placement request, checked in a fixed order:
//! account, instrument, type, price, quantity. [`validate`] stops at the
//! first violation; [`validate_all`] reports every one.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::domain::order_management::{OrderSide, PRICE_SCALE, QUANTITY_SCALE};
use crate::domain::shared::{AccountId, Amount, InstrumentId};

use super::dto::PlaceOrderRequest;
use super::errors::EngineError;

/// A single failed field rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Wire name of the field.
    pub field: &'static str,
    /// What is wrong with it.
    pub message: String,
}

impl FieldViolation {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl From<FieldViolation> for EngineError {
    fn from(violation: FieldViolation) -> Self {
        Self::InvalidInput(violation.to_string())
    }
}

/// A request whose fields all passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrder {
    /// Owning account.
    pub account_id: AccountId,
    /// Instrument to trade.
    pub instrument_id: InstrumentId,
    /// BUY or SELL.
    pub side: OrderSide,
    /// Positive price with at most 10 fractional digits.
    pub price: Amount,
    /// Positive quantity with at most 18 fractional digits.
    pub quantity: Amount,
}

/// Validate a request, returning the first violation.
///
/// # Errors
///
/// Returns the first [`FieldViolation`] in rule order.
pub fn validate(request: &PlaceOrderRequest) -> Result<ValidatedOrder, FieldViolation> {
    Ok(ValidatedOrder {
        account_id: account_id(request)?,
        instrument_id: instrument_id(request)?,
        side: side(request)?,
        price: price(request)?,
        quantity: quantity(request)?,
    })
}

/// Every violation in the request, in rule order.
#[must_use]
pub fn validate_all(request: &PlaceOrderRequest) -> Vec<FieldViolation> {
    [
        account_id(request).err(),
        instrument_id(request).err(),
        side(request).err(),
        price(request).err(),
        quantity(request).err(),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn account_id(request: &PlaceOrderRequest) -> Result<AccountId, FieldViolation> {
    required_text("account_id", request.account_id.as_deref()).map(AccountId::new)
}

fn instrument_id(request: &PlaceOrderRequest) -> Result<InstrumentId, FieldViolation> {
    required_text("instrument_id", request.instrument_id.as_deref()).map(InstrumentId::new)
}

fn side(request: &PlaceOrderRequest) -> Result<OrderSide, FieldViolation> {
    let text = required_text("type", request.side.as_deref())?;
    text.parse()
        .map_err(|_| FieldViolation::new("type", "must be one of BUY, SELL"))
}

fn price(request: &PlaceOrderRequest) -> Result<Amount, FieldViolation> {
    positive_amount("price", request.price.as_ref(), PRICE_SCALE)
}

fn quantity(request: &PlaceOrderRequest) -> Result<Amount, FieldViolation> {
    positive_amount("quantity", request.quantity.as_ref(), QUANTITY_SCALE)
}

fn required_text<'a>(
    field: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, FieldViolation> {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(FieldViolation::new(field, "is required")),
    }
}

/// Read a JSON string or number as a strictly positive amount with at
/// most `max_scale` fractional digits.
pub(crate) fn positive_amount(
    field: &'static str,
    value: Option<&Value>,
    max_scale: u32,
) -> Result<Amount, FieldViolation> {
    let amount = parse_amount(field, value)?;
    if !amount.is_positive() {
        return Err(FieldViolation::new(field, "must be greater than zero"));
    }
    if amount.fractional_digits() > max_scale {
        return Err(FieldViolation::new(
            field,
            format!("must have at most {max_scale} fractional digits"),
        ));
    }
    Ok(amount)
}

pub(crate) fn parse_amount(
    field: &'static str,
    value: Option<&Value>,
) -> Result<Amount, FieldViolation> {
    match value {
        None | Some(Value::Null) => Err(FieldViolation::new(field, "is required")),
        Some(v @ (Value::String(_) | Value::Number(_))) => Amount::deserialize(v)
            .map_err(|e| FieldViolation::new(field, format!("is not a decimal number ({e})"))),
        Some(_) => Err(FieldViolation::new(
            field,
            "must be a decimal string or number",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn valid_request() -> PlaceOrderRequest {
        PlaceOrderRequest::new("A1", "I1", "BUY", "100", "5")
    }

    #[test]
    fn accepts_well_formed_request() {
        let order = validate(&valid_request()).unwrap();
        assert_eq!(order.account_id, AccountId::new("A1"));
        assert_eq!(order.instrument_id, InstrumentId::new("I1"));
        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(order.price, Amount::from(100u32));
        assert_eq!(order.quantity, Amount::from(5u32));
    }

    #[test]
    fn accepts_numeric_amounts() {
        let request = PlaceOrderRequest {
            price: Some(json!(0.1)),
            quantity: Some(json!(3)),
            ..valid_request()
        };
        let order = validate(&request).unwrap();
        assert_eq!(order.price, Amount::parse("0.1").unwrap());
    }

    #[test_case("account_id" ; "missing account")]
    #[test_case("instrument_id" ; "missing instrument")]
    #[test_case("type" ; "missing type")]
    #[test_case("price" ; "missing price")]
    #[test_case("quantity" ; "missing quantity")]
    fn missing_field_is_reported(field: &str) {
        let mut request = valid_request();
        match field {
            "account_id" => request.account_id = None,
            "instrument_id" => request.instrument_id = None,
            "type" => request.side = None,
            "price" => request.price = None,
            _ => request.quantity = None,
        }
        let violation = validate(&request).unwrap_err();
        assert_eq!(violation.field, field);
        assert_eq!(violation.message, "is required");
    }

    #[test_case(json!("0"), "must be greater than zero" ; "zero")]
    #[test_case(json!("-1"), "must be greater than zero" ; "negative")]
    #[test_case(json!(-2.5), "must be greater than zero" ; "negative number")]
    #[test_case(json!("abc"), "is not a decimal number" ; "garbage")]
    #[test_case(json!(true), "must be a decimal string or number" ; "boolean")]
    #[test_case(json!("0.00000000001"), "at most 10 fractional digits" ; "too precise")]
    fn bad_price_is_rejected(price: Value, expected: &str) {
        let request = PlaceOrderRequest {
            price: Some(price),
            ..valid_request()
        };
        let violation = validate(&request).unwrap_err();
        assert_eq!(violation.field, "price");
        assert!(
            violation.message.contains(expected),
            "unexpected message: {}",
            violation.message
        );
    }

    #[test]
    fn quantity_allows_eighteen_fractional_digits() {
        let request = PlaceOrderRequest {
            quantity: Some(json!("0.000000000000000001")),
            ..valid_request()
        };
        assert!(validate(&request).is_ok());

        let request = PlaceOrderRequest {
            quantity: Some(json!("0.0000000000000000001")),
            ..valid_request()
        };
        assert_eq!(validate(&request).unwrap_err().field, "quantity");
    }

    #[test]
    fn unknown_type_is_rejected() {
        let request = PlaceOrderRequest {
            side: Some("HOLD".to_string()),
            ..valid_request()
        };
        let violation = validate(&request).unwrap_err();
        assert_eq!(violation.field, "type");
    }

    #[test]
    fn blank_ids_count_as_missing() {
        let request = PlaceOrderRequest {
            account_id: Some("   ".to_string()),
            ..valid_request()
        };
        assert_eq!(validate(&request).unwrap_err().field, "account_id");
    }

    #[test]
    fn first_violation_follows_rule_order() {
        let request = PlaceOrderRequest {
            instrument_id: None,
            price: Some(json!("-1")),
            ..valid_request()
        };
        assert_eq!(validate(&request).unwrap_err().field, "instrument_id");
    }

    #[test]
    fn validate_all_collects_every_violation() {
        let violations = validate_all(&PlaceOrderRequest::default());
        let fields: Vec<_> = violations.iter().map(|v| v.field).collect();
        assert_eq!(
            fields,
            vec!["account_id", "instrument_id", "type", "price", "quantity"]
        );
        assert!(validate_all(&valid_request()).is_empty());
    }

    #[test]
    fn violation_converts_to_invalid_input() {
        let err: EngineError = FieldViolation::new("price", "is required").into();
        assert_eq!(err.to_string(), "input validation failed: price: is required");
    }
}
