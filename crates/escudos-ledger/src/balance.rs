use chrono::{DateTime, Utc};
use escudos_store::GrantStore;
use escudos_types::{Grant, UserId};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Sum of the grants still valid at `now`. Saturates at `u64::MAX`.
pub fn valid_balance<'a, I>(grants: I, now: DateTime<Utc>) -> u64
where
    I: IntoIterator<Item = &'a Grant>,
{
    grants
        .into_iter()
        .filter(|g| g.is_valid_at(now))
        .fold(0u64, |acc, g| acc.saturating_add(g.amount))
}

/// Balance plus the next lapse, for "expiring soon" displays.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub user_id: UserId,
    pub balance: u64,
    pub as_of: DateTime<Utc>,
    /// Earliest expiry among the grants still valid at `as_of`.
    pub next_expiry: Option<DateTime<Utc>>,
    /// Credits that lapse at `next_expiry`.
    pub expiring_amount: u64,
}

impl BalanceSummary {
    pub fn compute(user_id: UserId, grants: &[Grant], now: DateTime<Utc>) -> Self {
        let next_expiry = grants
            .iter()
            .filter(|g| g.is_valid_at(now))
            .filter_map(|g| g.expires_at)
            .min();
        let expiring_amount = match next_expiry {
            Some(at) => grants
                .iter()
                .filter(|g| g.is_valid_at(now) && g.expires_at == Some(at))
                .fold(0u64, |acc, g| acc.saturating_add(g.amount)),
            None => 0,
        };

        Self {
            user_id,
            balance: valid_balance(grants, now),
            as_of: now,
            next_expiry,
            expiring_amount,
        }
    }
}

/// Aggregates a user's still-valid grants into a spendable balance.
///
/// `now` is always a parameter, never read internally, so results are a
/// pure function of the stored grants and the given instant.
pub struct BalanceCalculator;

impl BalanceCalculator {
    pub fn valid_balance<S: GrantStore + ?Sized>(
        store: &S,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Result<u64, LedgerError> {
        let grants = store.list_by_user(user)?;
        Ok(valid_balance(&grants, now))
    }

    pub fn summarize<S: GrantStore + ?Sized>(
        store: &S,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Result<BalanceSummary, LedgerError> {
        let grants = store.list_by_user(user)?;
        Ok(BalanceSummary::compute(user.clone(), &grants, now))
    }
}
