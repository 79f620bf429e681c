//! Row decoding and column formats.
//!
//! Amounts are stored as fixed-point text: prices with 10 fractional
//! digits, quantities with 18. Both read back to the exact value written.

use turso::{Row, Value};

use crate::domain::order_management::{
    DispatchState, DispatchStatus, Order, OrderSide, OrderStatus, PRICE_SCALE, QUANTITY_SCALE,
    ReconstitutedOrderParams, RepositoryError,
};
use crate::domain::shared::{AccountId, Amount, InstrumentId, OrderId, Timestamp};

/// Column list matching [`decode_order`].
pub(super) const ORDER_COLUMNS: &str = "o.id, o.account_id, o.instrument_id, o.side, o.status, \
     o.price, o.quantity, o.remaining_quantity, o.created_at, o.updated_at, \
     x.status, x.attempts, x.last_error";

pub(super) fn price_text(amount: Amount) -> String {
    amount.format_fixed(PRICE_SCALE)
}

pub(super) fn quantity_text(amount: Amount) -> String {
    amount.format_fixed(QUANTITY_SCALE)
}

pub(super) fn storage_error(err: turso::Error) -> RepositoryError {
    RepositoryError::Storage(err.to_string())
}

/// Read one row selected with [`ORDER_COLUMNS`].
pub(super) fn decode_order(row: &Row) -> Result<Order, RepositoryError> {
    let id = text(row, 0, "id", "?")?;
    let corrupt = |reason: String| RepositoryError::Corrupt {
        order_id: id.clone(),
        reason,
    };

    let side: OrderSide = text(row, 3, "side", &id)?
        .parse()
        .map_err(|e| corrupt(format!("side: {e}")))?;
    let status: OrderStatus = text(row, 4, "status", &id)?
        .parse()
        .map_err(|e| corrupt(format!("status: {e}")))?;
    let dispatch_status: DispatchStatus = text(row, 10, "dispatch status", &id)?
        .parse()
        .map_err(|e| corrupt(format!("dispatch status: {e}")))?;
    let attempts = match row.get_value(11).map_err(storage_error)? {
        Value::Integer(n) => u32::try_from(n).map_err(|_| corrupt(format!("attempts: {n}")))?,
        other => return Err(corrupt(format!("attempts: {other:?}"))),
    };
    let last_error = match row.get_value(12).map_err(storage_error)? {
        Value::Text(s) => Some(s),
        _ => None,
    };

    Order::reconstitute(ReconstitutedOrderParams {
        id: OrderId::new(id.clone()),
        account_id: AccountId::new(text(row, 1, "account_id", &id)?),
        instrument_id: InstrumentId::new(text(row, 2, "instrument_id", &id)?),
        side,
        status,
        price: amount(row, 5, "price", &id)?,
        quantity: amount(row, 6, "quantity", &id)?,
        remaining_quantity: amount(row, 7, "remaining_quantity", &id)?,
        dispatch: DispatchState {
            status: dispatch_status,
            attempts,
            last_error,
        },
        created_at: timestamp(row, 8, "created_at", &id)?,
        updated_at: timestamp(row, 9, "updated_at", &id)?,
    })
    .map_err(|e| corrupt(e.to_string()))
}

pub(super) fn text(
    row: &Row,
    idx: usize,
    column: &str,
    order_id: &str,
) -> Result<String, RepositoryError> {
    match row.get_value(idx).map_err(storage_error)? {
        Value::Text(s) => Ok(s),
        other => Err(RepositoryError::Corrupt {
            order_id: order_id.to_string(),
            reason: format!("{column}: expected text, found {other:?}"),
        }),
    }
}

fn amount(row: &Row, idx: usize, column: &str, order_id: &str) -> Result<Amount, RepositoryError> {
    let raw = text(row, idx, column, order_id)?;
    Amount::parse(&raw).map_err(|e| RepositoryError::Corrupt {
        order_id: order_id.to_string(),
        reason: format!("{column}: {e}"),
    })
}

fn timestamp(
    row: &Row,
    idx: usize,
    column: &str,
    order_id: &str,
) -> Result<Timestamp, RepositoryError> {
    let raw = text(row, idx, column, order_id)?;
    Timestamp::parse(&raw).map_err(|e| RepositoryError::Corrupt {
        order_id: order_id.to_string(),
        reason: format!("{column}: {e}"),
    })
}
