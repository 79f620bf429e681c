//! Per-(account, asset) placement locks.
//!
//! When enabled, the balance check and the order write for the same
//! account and settlement asset run one at a time inside this process, so
//! two orders cannot both pass the check against the same funds.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::shared::{AccountId, Asset};

type LockKey = (AccountId, Asset);

/// Keyed async locks serializing placements per account and asset.
#[derive(Debug, Default)]
pub struct ReservationLocks {
    locks: Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
}

/// Held while a placement checks funds and writes its order.
#[derive(Debug)]
pub struct ReservationGuard {
    _guard: OwnedMutexGuard<()>,
}

impl ReservationLocks {
    /// Empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `(account_id, asset)`.
    pub async fn acquire(&self, account_id: &AccountId, asset: &Asset) -> ReservationGuard {
        let lock = {
            let mut locks = self.locks.lock();
            // Drop entries nobody is holding or waiting on.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(
                locks
                    .entry((account_id.clone(), asset.clone()))
                    .or_default(),
            )
        };
        ReservationGuard {
            _guard: lock.lock_owned().await,
        }
    }

    /// Number of keys currently tracked.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.locks.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = Arc::new(ReservationLocks::new());
        let account = AccountId::new("A1");
        let asset = Asset::new("USD");

        let guard = locks.acquire(&account, &asset).await;
        let contender = {
            let locks = Arc::clone(&locks);
            let account = account.clone();
            let asset = asset.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&account, &asset).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = ReservationLocks::new();
        let _usd = locks.acquire(&AccountId::new("A1"), &Asset::new("USD")).await;
        let btc = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(&AccountId::new("A1"), &Asset::new("BTC")),
        )
        .await;
        assert!(btc.is_ok());
    }

    #[tokio::test]
    async fn released_keys_are_pruned() {
        let locks = ReservationLocks::new();
        drop(locks.acquire(&AccountId::new("A1"), &Asset::new("USD")).await);
        drop(locks.acquire(&AccountId::new("A2"), &Asset::new("USD")).await);
        assert_eq!(locks.tracked_keys(), 1);
    }
}
