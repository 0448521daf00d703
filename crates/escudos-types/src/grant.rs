use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{EventId, GrantId, UserId};
use crate::source::GrantSource;

/// An immutable record of credits issued to a user from one source event.
///
/// Grants are never amended or deleted. Whether a grant still counts toward
/// a balance is decided at read time by comparing `expires_at` with the
/// caller's notion of "now"; there is no stored expired flag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub id: GrantId,
    pub user_id: UserId,
    /// Always greater than zero.
    pub amount: u64,
    pub source: GrantSource,
    pub issued_at: DateTime<Utc>,
    /// `None` means the grant never expires.
    pub expires_at: Option<DateTime<Utc>>,
    /// Idempotency key; unique system-wide when present.
    pub source_event_id: Option<EventId>,
}

impl Grant {
    /// A grant counts toward the balance while `expires_at` is unset or
    /// strictly after `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            None => true,
            Some(expires_at) => expires_at > now,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_valid_at(now)
    }

    pub fn never_expires(&self) -> bool {
        self.expires_at.is_none()
    }
}
