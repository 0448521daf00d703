use chrono::{DateTime, Utc};
use escudos_store::GrantStore;
use escudos_types::{EventId, Grant, GrantId, GrantSource, UserId};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::balance::{BalanceCalculator, BalanceSummary};
use crate::cache::BalanceCache;
use crate::clock::{Clock, SystemClock};
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::expiry::ExpiryPolicy;
use crate::history::{newest_first, HistoryView};
use crate::idempotency::{IdempotencyGuard, Issued};

/// A request to credit a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRequest {
    pub user_id: UserId,
    /// Signed so that non-positive amounts can be reported back verbatim.
    pub amount: i64,
    pub source: GrantSource,
    pub source_event_id: Option<EventId>,
}

impl IssueRequest {
    /// Admin-issued credit. Never deduplicated.
    pub fn manual(user_id: UserId, amount: i64) -> Self {
        Self {
            user_id,
            amount,
            source: GrantSource::Manual,
            source_event_id: None,
        }
    }

    /// Credit from a confirmed subscription payment, keyed by the provider's event id.
    pub fn subscription(user_id: UserId, amount: i64, event_id: EventId) -> Self {
        Self {
            user_id,
            amount,
            source: GrantSource::Subscription,
            source_event_id: Some(event_id),
        }
    }
}

/// Public entry point of the ledger.
///
/// Stateless over a shared store apart from the optional balance cache;
/// share it across request handlers behind an `Arc`.
pub struct LedgerService<S, C = SystemClock> {
    store: S,
    clock: C,
    policy: ExpiryPolicy,
    cache: Option<BalanceCache>,
}

impl<S: GrantStore> LedgerService<S, SystemClock> {
    pub fn new(store: S, config: &LedgerConfig) -> Self {
        Self::with_clock(store, SystemClock, config)
    }
}

impl<S: GrantStore, C: Clock> LedgerService<S, C> {
    pub fn with_clock(store: S, clock: C, config: &LedgerConfig) -> Self {
        Self {
            store,
            clock,
            policy: config.expiry_policy(),
            cache: config.balance_cache_ttl_secs.map(BalanceCache::new),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn policy(&self) -> &ExpiryPolicy {
        &self.policy
    }

    /// Credit a user.
    ///
    /// A repeated `source_event_id` returns the grant recorded for the first
    /// delivery as [`Issued::AlreadyApplied`]; it is never an error.
    pub fn issue(&self, request: IssueRequest) -> Result<Issued, LedgerError> {
        let amount = u64::try_from(request.amount)
            .ok()
            .filter(|&a| a > 0)
            .ok_or(LedgerError::InvalidAmount {
                amount: request.amount,
            })?;

        let issued_at = self.clock.now();
        let grant = Grant {
            id: GrantId::new(),
            user_id: request.user_id,
            amount,
            source: request.source,
            issued_at,
            expires_at: self.policy.compute_expiry(request.source, issued_at),
            source_event_id: request.source_event_id,
        };

        let issued = IdempotencyGuard::append(&self.store, &grant)?;
        if let Some(cache) = &self.cache {
            cache.invalidate(&issued.grant().user_id);
        }

        let stored = issued.grant();
        info!(
            grant = %stored.id,
            user = %stored.user_id,
            amount = stored.amount,
            source = %stored.source,
            event = stored.source_event_id.as_ref().map(EventId::as_str),
            replayed = issued.was_replayed(),
            "grant issued"
        );
        Ok(issued)
    }

    /// Spendable balance right now.
    pub fn balance(&self, user: &UserId) -> Result<u64, LedgerError> {
        Ok(self.balance_summary(user)?.balance)
    }

    /// Spendable balance at an explicit instant. Bypasses the cache.
    pub fn balance_at(&self, user: &UserId, now: DateTime<Utc>) -> Result<u64, LedgerError> {
        BalanceCalculator::valid_balance(&self.store, user, now)
    }

    /// Balance and next lapse right now, served from the cache when enabled.
    pub fn balance_summary(&self, user: &UserId) -> Result<BalanceSummary, LedgerError> {
        let now = self.clock.now();
        let Some(cache) = &self.cache else {
            return BalanceCalculator::summarize(&self.store, user, now);
        };
        if let Some(summary) = cache.get(user, now) {
            return Ok(summary);
        }
        let generation = cache.generation(user);
        let summary = BalanceCalculator::summarize(&self.store, user, now)?;
        cache.put(user, now, generation, summary.clone());
        Ok(summary)
    }

    /// All grants of the user, newest first.
    pub fn history(&self, user: &UserId) -> Result<Vec<Grant>, LedgerError> {
        let mut grants = self.store.list_by_user(user)?;
        grants.sort_by(newest_first);
        Ok(grants)
    }

    pub fn history_view(&self, user: &UserId) -> Result<HistoryView, LedgerError> {
        let grants = self.store.list_by_user(user)?;
        Ok(HistoryView::project(user.clone(), grants, self.clock.now()))
    }

    pub fn grant_count(&self) -> Result<u64, LedgerError> {
        Ok(self.store.grant_count()?)
    }
}
