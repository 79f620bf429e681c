//! Lookup traits for reference data.
//!
//! Each returns `Ok(None)` for a missing record; `Err` is reserved for
//! the lookup itself failing.

use async_trait::async_trait;

use super::entities::{Account, Balance, Instrument};
use crate::domain::shared::{AccountId, Asset, InstrumentId};

/// Failure of a reference lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{resource} lookup failed: {message}")]
pub struct LookupError {
    /// What was being looked up.
    pub resource: &'static str,
    /// Underlying failure.
    pub message: String,
}

impl LookupError {
    /// Build a lookup error.
    pub fn new(resource: &'static str, message: impl Into<String>) -> Self {
        Self {
            resource,
            message: message.into(),
        }
    }
}

/// Account lookup.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Find an account by id.
    ///
    /// # Errors
    ///
    /// Returns `LookupError` if the backing store fails.
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, LookupError>;
}

/// Instrument lookup.
#[async_trait]
pub trait InstrumentRepository: Send + Sync {
    /// Find an instrument by id.
    ///
    /// # Errors
    ///
    /// Returns `LookupError` if the backing store fails.
    async fn find_by_id(&self, id: &InstrumentId) -> Result<Option<Instrument>, LookupError>;
}

/// Balance lookup.
#[async_trait]
pub trait BalanceRepository: Send + Sync {
    /// Find the balance an account holds in one asset.
    ///
    /// # Errors
    ///
    /// Returns `LookupError` if the backing store fails.
    async fn find_by_account_and_asset(
        &self,
        account_id: &AccountId,
        asset: &Asset,
    ) -> Result<Option<Balance>, LookupError>;
}
