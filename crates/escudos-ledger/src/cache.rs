use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use escudos_types::UserId;

use crate::balance::BalanceSummary;

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<UserId, (i64, BalanceSummary)>,
    /// Bumped by every invalidation of the user.
    generations: HashMap<UserId, u64>,
}

/// Read-through cache of per-user balance summaries.
///
/// Entries are keyed by user and by `now` floored to a TTL-sized bucket, so a
/// cached value is reused only within the bucket it was computed in. Issuing
/// a grant invalidates the user's entry and bumps the user's generation; a
/// summary computed under an older generation is never stored.
#[derive(Debug)]
pub struct BalanceCache {
    ttl_secs: i64,
    state: Mutex<CacheState>,
}

impl BalanceCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl_secs: i64::try_from(ttl_secs.max(1)).unwrap_or(i64::MAX),
            state: Mutex::new(CacheState::default()),
        }
    }

    fn bucket(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp().div_euclid(self.ttl_secs)
    }

    /// Current generation of the user. Read it before computing a value to `put`.
    pub fn generation(&self, user: &UserId) -> u64 {
        self.state
            .lock()
            .map(|s| s.generations.get(user).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn get(&self, user: &UserId, now: DateTime<Utc>) -> Option<BalanceSummary> {
        let bucket = self.bucket(now);
        let state = self.state.lock().ok()?;
        match state.entries.get(user) {
            Some((cached_bucket, summary)) if *cached_bucket == bucket => Some(summary.clone()),
            _ => None,
        }
    }

    /// Store `summary` unless the user was invalidated since `generation` was read.
    /// Returns whether the value was stored.
    pub fn put(
        &self,
        user: &UserId,
        now: DateTime<Utc>,
        generation: u64,
        summary: BalanceSummary,
    ) -> bool {
        let bucket = self.bucket(now);
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        if state.generations.get(user).copied().unwrap_or(0) != generation {
            return false;
        }
        state.entries.insert(user.clone(), (bucket, summary));
        true
    }

    pub fn invalidate(&self, user: &UserId) {
        if let Ok(mut state) = self.state.lock() {
            state.entries.remove(user);
            let generation = state.generations.entry(user.clone()).or_insert(0);
            *generation = generation.wrapping_add(1);
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
