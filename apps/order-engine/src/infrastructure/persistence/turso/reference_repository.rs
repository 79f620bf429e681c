//! Turso lookups for accounts, instruments and balances.

use async_trait::async_trait;
use turso::{Row, Value};

use super::{PersistenceError, TursoStore};
use crate::domain::reference::{
    Account, AccountRepository, Balance, BalanceRepository, Instrument, InstrumentRepository,
    LookupError,
};
use crate::domain::shared::{AccountId, Amount, Asset, InstrumentId};

/// Reference data stored alongside orders.
#[derive(Debug, Clone)]
pub struct TursoReferenceRepository {
    store: TursoStore,
}

impl TursoReferenceRepository {
    /// Repository over an opened, migrated store.
    #[must_use]
    pub const fn new(store: TursoStore) -> Self {
        Self { store }
    }

    /// Insert or replace an account.
    ///
    /// # Errors
    ///
    /// Returns `Query` if the write fails.
    pub async fn upsert_account(&self, account: &Account) -> Result<(), PersistenceError> {
        let conn = self.store.connection().await;
        conn.execute(
            "INSERT OR REPLACE INTO accounts (id, name, email) VALUES (?1, ?2, ?3)",
            vec![
                Value::Text(account.id.to_string()),
                Value::Text(account.name.clone()),
                Value::Text(account.email.clone()),
            ],
        )
        .await?;
        Ok(())
    }

    /// Insert or replace an instrument.
    ///
    /// # Errors
    ///
    /// Returns `Query` if the write fails.
    pub async fn upsert_instrument(&self, instrument: &Instrument) -> Result<(), PersistenceError> {
        let conn = self.store.connection().await;
        conn.execute(
            "INSERT OR REPLACE INTO instruments (id, base_asset, quote_asset) VALUES (?1, ?2, ?3)",
            vec![
                Value::Text(instrument.id.to_string()),
                Value::Text(instrument.base_asset.to_string()),
                Value::Text(instrument.quote_asset.to_string()),
            ],
        )
        .await?;
        Ok(())
    }

    /// Set an account's balance in an asset.
    ///
    /// # Errors
    ///
    /// Returns `Query` if the write fails.
    pub async fn set_balance(&self, balance: &Balance) -> Result<(), PersistenceError> {
        let conn = self.store.connection().await;
        conn.execute(
            "INSERT OR REPLACE INTO balances (account_id, asset, amount) VALUES (?1, ?2, ?3)",
            vec![
                Value::Text(balance.account_id.to_string()),
                Value::Text(balance.asset.to_string()),
                Value::Text(balance.amount.to_string()),
            ],
        )
        .await?;
        Ok(())
    }

    async fn first_row<T, F>(
        &self,
        resource: &'static str,
        sql: &str,
        params: Vec<Value>,
        decode: F,
    ) -> Result<Option<T>, LookupError>
    where
        F: FnOnce(&Row) -> Result<T, String>,
    {
        let conn = self.store.connection().await;
        let mut rows = conn
            .query(sql, params)
            .await
            .map_err(|e| LookupError::new(resource, e.to_string()))?;
        let row = rows
            .next()
            .await
            .map_err(|e| LookupError::new(resource, e.to_string()))?;
        row.map(|row| decode(&row).map_err(|e| LookupError::new(resource, e)))
            .transpose()
    }
}

fn text(row: &Row, idx: usize) -> Result<String, String> {
    match row.get_value(idx).map_err(|e| e.to_string())? {
        Value::Text(s) => Ok(s),
        other => Err(format!("column {idx}: expected text, found {other:?}")),
    }
}

#[async_trait]
impl AccountRepository for TursoReferenceRepository {
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, LookupError> {
        self.first_row(
            "account",
            "SELECT id, name, email FROM accounts WHERE id = ?1",
            vec![Value::Text(id.to_string())],
            |row| {
                Ok(Account {
                    id: AccountId::new(text(row, 0)?),
                    name: text(row, 1)?,
                    email: text(row, 2)?,
                })
            },
        )
        .await
    }
}

#[async_trait]
impl InstrumentRepository for TursoReferenceRepository {
    async fn find_by_id(&self, id: &InstrumentId) -> Result<Option<Instrument>, LookupError> {
        self.first_row(
            "instrument",
            "SELECT id, base_asset, quote_asset FROM instruments WHERE id = ?1",
            vec![Value::Text(id.to_string())],
            |row| {
                Ok(Instrument {
                    id: InstrumentId::new(text(row, 0)?),
                    base_asset: Asset::new(text(row, 1)?),
                    quote_asset: Asset::new(text(row, 2)?),
                })
            },
        )
        .await
    }
}

#[async_trait]
impl BalanceRepository for TursoReferenceRepository {
    async fn find_by_account_and_asset(
        &self,
        account_id: &AccountId,
        asset: &Asset,
    ) -> Result<Option<Balance>, LookupError> {
        self.first_row(
            "balance",
            "SELECT amount FROM balances WHERE account_id = ?1 AND asset = ?2",
            vec![
                Value::Text(account_id.to_string()),
                Value::Text(asset.to_string()),
            ],
            |row| {
                let amount = Amount::parse(&text(row, 0)?).map_err(|e| e.to_string())?;
                Ok(Balance {
                    account_id: account_id.clone(),
                    asset: asset.clone(),
                    amount,
                })
            },
        )
        .await
    }
}
