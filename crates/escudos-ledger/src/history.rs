use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use escudos_types::{EventId, Grant, GrantId, GrantSource, UserId};
use serde::{Deserialize, Serialize};

/// Newest first: `issued_at` descending, then id descending.
pub(crate) fn newest_first(a: &Grant, b: &Grant) -> Ordering {
    b.issued_at.cmp(&a.issued_at).then_with(|| b.id.cmp(&a.id))
}

/// A grant as shown to a user, with its expiry state derived at `as_of`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: GrantId,
    pub amount: u64,
    pub source: GrantSource,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub source_event_id: Option<EventId>,
    pub is_expired: bool,
}

impl HistoryEntry {
    fn from_grant(grant: Grant, now: DateTime<Utc>) -> Self {
        Self {
            is_expired: grant.is_expired_at(now),
            id: grant.id,
            amount: grant.amount,
            source: grant.source,
            issued_at: grant.issued_at,
            expires_at: grant.expires_at,
            source_event_id: grant.source_event_id,
        }
    }
}

/// Read-only projection of a user's grants for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryView {
    pub user_id: UserId,
    pub as_of: DateTime<Utc>,
    pub entries: Vec<HistoryEntry>,
}

impl HistoryView {
    pub fn project(user_id: UserId, mut grants: Vec<Grant>, now: DateTime<Utc>) -> Self {
        grants.sort_by(newest_first);
        Self {
            user_id,
            as_of: now,
            entries: grants
                .into_iter()
                .map(|g| HistoryEntry::from_grant(g, now))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn active(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().filter(|e| !e.is_expired)
    }

    pub fn expired(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().filter(|e| e.is_expired)
    }
}
