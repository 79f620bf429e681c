//! Turso implementation of `OrderRepository`.

use async_trait::async_trait;
use tracing::debug;
use turso::{Connection, Value};

use super::TursoStore;
use super::codec::{ORDER_COLUMNS, decode_order, price_text, quantity_text, storage_error};
use crate::domain::order_management::{
    DispatchStatus, NewOrder, Order, OrderRepository, OrderStatus, OrderVersion, RepositoryError,
};
use crate::domain::shared::{AccountId, InstrumentId, OrderId, Timestamp};

const SELECT_ORDERS: &str = "FROM orders o JOIN order_outbox x ON x.order_id = o.id";

/// Orders and outbox entries in a Turso database.
#[derive(Debug, Clone)]
pub struct TursoOrderRepository {
    store: TursoStore,
}

impl TursoOrderRepository {
    /// Repository over an opened, migrated store.
    #[must_use]
    pub const fn new(store: TursoStore) -> Self {
        Self { store }
    }
}

async fn fetch(
    conn: &Connection,
    filter: &str,
    params: Vec<Value>,
) -> Result<Vec<Order>, RepositoryError> {
    let sql = format!("SELECT {ORDER_COLUMNS} {SELECT_ORDERS} {filter}");
    let mut rows = conn.query(&sql, params).await.map_err(storage_error)?;
    let mut orders = Vec::new();
    while let Some(row) = rows.next().await.map_err(storage_error)? {
        orders.push(decode_order(&row)?);
    }
    Ok(orders)
}

async fn fetch_one(conn: &Connection, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
    let mut found = fetch(
        conn,
        "WHERE o.id = ?1",
        vec![Value::Text(id.to_string())],
    )
    .await?;
    Ok(found.pop())
}

async fn insert(conn: &Connection, order: &Order) -> Result<(), RepositoryError> {
    conn.execute(
        "INSERT INTO orders (
            id, account_id, instrument_id, side, status,
            price, quantity, remaining_quantity, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        vec![
            Value::Text(order.id().to_string()),
            Value::Text(order.account_id().to_string()),
            Value::Text(order.instrument_id().to_string()),
            Value::Text(order.side().as_str().to_string()),
            Value::Text(order.status().as_str().to_string()),
            Value::Text(price_text(order.price())),
            Value::Text(quantity_text(order.quantity())),
            Value::Text(quantity_text(order.remaining_quantity())),
            Value::Text(order.created_at().to_storage_string()),
            Value::Text(order.updated_at().to_storage_string()),
        ],
    )
    .await
    .map_err(storage_error)?;

    conn.execute(
        "INSERT INTO order_outbox (order_id, status, attempts, created_at)
         VALUES (?1, ?2, 0, ?3)",
        vec![
            Value::Text(order.id().to_string()),
            Value::Text(DispatchStatus::Pending.as_str().to_string()),
            Value::Text(order.created_at().to_storage_string()),
        ],
    )
    .await
    .map_err(storage_error)?;

    Ok(())
}

fn require_row(affected: u64, id: &OrderId) -> Result<(), RepositoryError> {
    if affected == 0 {
        return Err(RepositoryError::NotFound {
            order_id: id.to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl OrderRepository for TursoOrderRepository {
    async fn create(&self, draft: &NewOrder) -> Result<Order, RepositoryError> {
        let order = Order::from_new(OrderId::generate(), draft.clone(), Timestamp::now());
        let conn = self.store.connection().await;

        conn.execute("BEGIN", ()).await.map_err(storage_error)?;
        if let Err(e) = insert(&conn, &order).await {
            if let Err(rollback) = conn.execute("ROLLBACK", ()).await {
                tracing::error!(error = %rollback, "Rollback after failed order insert failed");
            }
            return Err(e);
        }
        conn.execute("COMMIT", ()).await.map_err(storage_error)?;

        debug!(order_id = %order.id(), "Order and outbox entry saved to database");
        Ok(order)
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let conn = self.store.connection().await;
        fetch_one(&conn, id).await
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let conn = self.store.connection().await;
        fetch(&conn, "ORDER BY o.seq", Vec::new()).await
    }

    async fn list_by_instrument(
        &self,
        instrument_id: &InstrumentId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let conn = self.store.connection().await;
        fetch(
            &conn,
            "WHERE o.instrument_id = ?1 ORDER BY o.seq",
            vec![Value::Text(instrument_id.to_string())],
        )
        .await
    }

    async fn list_open_by_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let conn = self.store.connection().await;
        fetch(
            &conn,
            "WHERE o.account_id = ?1 AND o.status IN (?2, ?3) ORDER BY o.seq",
            vec![
                Value::Text(account_id.to_string()),
                Value::Text(OrderStatus::Open.as_str().to_string()),
                Value::Text(OrderStatus::PartiallyFilled.as_str().to_string()),
            ],
        )
        .await
    }

    async fn update(
        &self,
        order: &Order,
        expected: &OrderVersion,
    ) -> Result<Order, RepositoryError> {
        order
            .check_invariants()
            .map_err(|e| RepositoryError::Corrupt {
                order_id: order.id().to_string(),
                reason: e.to_string(),
            })?;

        let conn = self.store.connection().await;
        let affected = conn
            .execute(
                "UPDATE orders SET status = ?1, remaining_quantity = ?2, updated_at = ?3
                 WHERE id = ?4 AND status = ?5 AND remaining_quantity = ?6",
                vec![
                    Value::Text(order.status().as_str().to_string()),
                    Value::Text(quantity_text(order.remaining_quantity())),
                    Value::Text(Timestamp::now().to_storage_string()),
                    Value::Text(order.id().to_string()),
                    Value::Text(expected.status.as_str().to_string()),
                    Value::Text(quantity_text(expected.remaining_quantity)),
                ],
            )
            .await
            .map_err(storage_error)?;

        if affected == 0 {
            return match fetch_one(&conn, order.id()).await? {
                Some(_) => Err(RepositoryError::Conflict {
                    order_id: order.id().to_string(),
                }),
                None => Err(RepositoryError::NotFound {
                    order_id: order.id().to_string(),
                }),
            };
        }

        fetch_one(&conn, order.id())
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                order_id: order.id().to_string(),
            })
    }

    async fn list_undispatched(&self, limit: usize) -> Result<Vec<Order>, RepositoryError> {
        let conn = self.store.connection().await;
        fetch(
            &conn,
            "WHERE x.status = ?1 ORDER BY o.seq LIMIT ?2",
            vec![
                Value::Text(DispatchStatus::Pending.as_str().to_string()),
                Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)),
            ],
        )
        .await
    }

    async fn mark_dispatched(&self, id: &OrderId) -> Result<(), RepositoryError> {
        let conn = self.store.connection().await;
        let affected = conn
            .execute(
                "UPDATE order_outbox
                 SET status = ?1, attempts = attempts + 1, last_error = NULL, dispatched_at = ?2
                 WHERE order_id = ?3",
                vec![
                    Value::Text(DispatchStatus::Dispatched.as_str().to_string()),
                    Value::Text(Timestamp::now().to_storage_string()),
                    Value::Text(id.to_string()),
                ],
            )
            .await
            .map_err(storage_error)?;
        require_row(affected, id)
    }

    async fn record_dispatch_failure(
        &self,
        id: &OrderId,
        reason: &str,
    ) -> Result<(), RepositoryError> {
        let conn = self.store.connection().await;
        let affected = conn
            .execute(
                "UPDATE order_outbox SET attempts = attempts + 1, last_error = ?1
                 WHERE order_id = ?2",
                vec![Value::Text(reason.to_string()), Value::Text(id.to_string())],
            )
            .await
            .map_err(storage_error)?;
        require_row(affected, id)
    }
}
