use escudos_store::{GrantStore, StoreError};
use escudos_types::{EventId, Grant};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::LedgerError;

/// Outcome of a grant issuance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "grant", rename_all = "snake_case")]
pub enum Issued {
    /// A new grant was recorded.
    Created(Grant),
    /// The event was already applied; this is the grant recorded for it.
    AlreadyApplied(Grant),
}

impl Issued {
    pub fn grant(&self) -> &Grant {
        match self {
            Self::Created(g) | Self::AlreadyApplied(g) => g,
        }
    }

    pub fn into_grant(self) -> Grant {
        match self {
            Self::Created(g) | Self::AlreadyApplied(g) => g,
        }
    }

    /// `true` when the call was absorbed as a repeat delivery.
    pub fn was_replayed(&self) -> bool {
        matches!(self, Self::AlreadyApplied(_))
    }
}

/// At-most-once crediting per external event.
///
/// The store's uniqueness constraint on `source_event_id` is the single
/// source of truth. The guard never looks up before inserting: it appends,
/// and when the store reports the key as taken it returns the grant that won.
pub struct IdempotencyGuard;

impl IdempotencyGuard {
    /// Append `grant`, absorbing a duplicate event into
    /// [`Issued::AlreadyApplied`].
    pub fn append<S: GrantStore + ?Sized>(store: &S, grant: &Grant) -> Result<Issued, LedgerError> {
        match store.append(grant) {
            Ok(stored) => Ok(Issued::Created(stored)),
            Err(StoreError::DuplicateEvent { event_id }) => {
                let existing = store.find_by_event_id(&event_id)?.ok_or_else(|| {
                    LedgerError::Persistence(StoreError::Inconsistent(format!(
                        "event {event_id} conflicted but its grant is missing"
                    )))
                })?;

                if existing.user_id != grant.user_id || existing.amount != grant.amount {
                    warn!(
                        event = %event_id,
                        stored_user = %existing.user_id,
                        stored_amount = existing.amount,
                        replay_user = %grant.user_id,
                        replay_amount = grant.amount,
                        "replayed event differs from the recorded grant; keeping the first"
                    );
                }
                Ok(Issued::AlreadyApplied(existing))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Advisory check that `event_id` has not been applied yet.
    ///
    /// Racy by nature; only [`IdempotencyGuard::append`] is authoritative.
    pub fn ensure_not_duplicate<S: GrantStore + ?Sized>(
        store: &S,
        event_id: &EventId,
    ) -> Result<(), LedgerError> {
        match store.find_by_event_id(event_id)? {
            Some(_) => Err(LedgerError::DuplicateEvent {
                event_id: event_id.clone(),
            }),
            None => Ok(()),
        }
    }
}
