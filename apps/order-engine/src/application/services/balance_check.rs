//! Balance Sufficiency Check
//!
//! Read-only comparison of an account's settlement balance with what an
//! order needs. The balance is never locked or modified here; a second
//! order may spend the same funds between this read and the order write
//! unless the caller serializes placements (see [`super::ReservationLocks`]).

use std::sync::Arc;

use crate::application::errors::{EngineError, Resource};
use crate::domain::order_management::services::SettlementRequirement;
use crate::domain::reference::{Balance, BalanceRepository};
use crate::domain::shared::{AccountId, Notional};

/// Checks that an account holds enough of the settlement asset.
pub struct BalanceCheck<B: BalanceRepository> {
    balances: Arc<B>,
}

impl<B: BalanceRepository> BalanceCheck<B> {
    /// Create a check over a balance lookup.
    pub const fn new(balances: Arc<B>) -> Self {
        Self { balances }
    }

    /// Verify `balance - already_committed >= requirement.amount`.
    ///
    /// # Errors
    ///
    /// - `NotFound` when the account holds no balance in the asset
    /// - `InsufficientFunds` when the spendable amount is too small
    /// - `Lookup` when the balance read fails
    pub async fn ensure_sufficient(
        &self,
        account_id: &AccountId,
        requirement: &SettlementRequirement,
        already_committed: Notional,
    ) -> Result<Balance, EngineError> {
        let balance = self
            .balances
            .find_by_account_and_asset(account_id, &requirement.asset)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                resource: Resource::Balance,
                id: format!("{account_id}/{}", requirement.asset),
            })?;

        let available = (Notional::from(balance.amount) - already_committed).clamp_at_zero();

        if available < requirement.amount {
            return Err(EngineError::InsufficientFunds {
                asset: requirement.asset.clone(),
                required: requirement.amount.clone(),
                available,
            });
        }

        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reference::LookupError;
    use crate::domain::shared::{Amount, Asset};
    use async_trait::async_trait;

    struct FixedBalance(Option<Amount>);

    #[async_trait]
    impl BalanceRepository for FixedBalance {
        async fn find_by_account_and_asset(
            &self,
            account_id: &AccountId,
            asset: &Asset,
        ) -> Result<Option<Balance>, LookupError> {
            Ok(self.0.map(|amount| Balance {
                account_id: account_id.clone(),
                asset: asset.clone(),
                amount,
            }))
        }
    }

    struct BrokenBalances;

    #[async_trait]
    impl BalanceRepository for BrokenBalances {
        async fn find_by_account_and_asset(
            &self,
            _account_id: &AccountId,
            _asset: &Asset,
        ) -> Result<Option<Balance>, LookupError> {
            Err(LookupError::new("balance", "connection reset"))
        }
    }

    fn usd(amount: &str) -> SettlementRequirement {
        SettlementRequirement {
            asset: Asset::new("USD"),
            amount: Notional::from(Amount::parse(amount).unwrap()),
        }
    }

    fn check(balance: Option<&str>) -> BalanceCheck<FixedBalance> {
        BalanceCheck::new(Arc::new(FixedBalance(
            balance.map(|b| Amount::parse(b).unwrap()),
        )))
    }

    #[tokio::test]
    async fn exact_balance_is_sufficient() {
        let result = check(Some("500"))
            .ensure_sufficient(&AccountId::new("A1"), &usd("500"), Notional::zero())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn short_balance_is_rejected() {
        let result = check(Some("1000"))
            .ensure_sufficient(&AccountId::new("A1"), &usd("1500"), Notional::zero())
            .await;
        match result {
            Err(EngineError::InsufficientFunds {
                required,
                available,
                ..
            }) => {
                assert_eq!(required, Amount::parse("1500").unwrap());
                assert_eq!(available, Amount::parse("1000").unwrap());
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn committed_funds_reduce_availability() {
        let result = check(Some("1000"))
            .ensure_sufficient(
                &AccountId::new("A1"),
                &usd("600"),
                Notional::from(500u32),
            )
            .await;
        assert!(matches!(
            result,
            Err(EngineError::InsufficientFunds { .. })
        ));
    }

    #[tokio::test]
    async fn comparison_uses_full_notional_precision() {
        let required = SettlementRequirement {
            asset: Asset::new("USD"),
            amount: Notional::product(
                Amount::parse("3500.1234567891").unwrap(),
                Amount::parse("0.123456789012345678").unwrap(),
            ),
        };

        let enough = check(Some("432.1140031219739333576651426"))
            .ensure_sufficient(&AccountId::new("A1"), &required, Notional::zero())
            .await;
        assert!(enough.is_ok());

        let short = check(Some("432.1140031219739333576651425"))
            .ensure_sufficient(&AccountId::new("A1"), &required, Notional::zero())
            .await;
        assert!(matches!(short, Err(EngineError::InsufficientFunds { .. })));
    }

    #[tokio::test]
    async fn committed_beyond_balance_leaves_nothing() {
        let result = check(Some("100"))
            .ensure_sufficient(&AccountId::new("A1"), &usd("1"), Notional::from(250u32))
            .await;
        let Err(EngineError::InsufficientFunds { available, .. }) = result else {
            panic!("expected InsufficientFunds");
        };
        assert_eq!(available, Notional::zero());
    }

    #[tokio::test]
    async fn missing_balance_is_not_found() {
        let result = check(None)
            .ensure_sufficient(&AccountId::new("A1"), &usd("1"), Notional::zero())
            .await;
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "balance not found for required asset");
    }

    #[tokio::test]
    async fn lookup_failure_propagates() {
        let check = BalanceCheck::new(Arc::new(BrokenBalances));
        let result = check
            .ensure_sufficient(&AccountId::new("A1"), &usd("1"), Notional::zero())
            .await;
        assert!(matches!(result, Err(EngineError::Lookup(_))));
    }
}
