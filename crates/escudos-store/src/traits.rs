use escudos_types::{EventId, Grant, GrantId, UserId};

use crate::error::StoreResult;

/// Durable, append-only store of credit grants.
///
/// All implementations must satisfy these invariants:
/// - Grants are immutable once written and are never removed.
/// - At most one grant exists per non-null `source_event_id`. A second
///   append with the same key fails with `StoreError::DuplicateEvent`; the
///   check and the insert are a single atomic step.
/// - Concurrent reads are always safe.
/// - No implicit expiry cleanup happens; expired grants stay readable.
pub trait GrantStore: Send + Sync {
    /// Insert a new grant and return it as stored.
    fn append(&self, grant: &Grant) -> StoreResult<Grant>;

    /// All grants of a user. Order is unspecified; callers sort as needed.
    fn list_by_user(&self, user: &UserId) -> StoreResult<Vec<Grant>>;

    /// Look up the grant recorded for an external event.
    fn find_by_event_id(&self, event_id: &EventId) -> StoreResult<Option<Grant>>;

    /// Look up a grant by id.
    fn get(&self, id: &GrantId) -> StoreResult<Option<Grant>>;

    /// Total number of grants across all users.
    fn grant_count(&self) -> StoreResult<u64>;
}

impl<T: GrantStore + ?Sized> GrantStore for Box<T> {
    fn append(&self, grant: &Grant) -> StoreResult<Grant> {
        (**self).append(grant)
    }

    fn list_by_user(&self, user: &UserId) -> StoreResult<Vec<Grant>> {
        (**self).list_by_user(user)
    }

    fn find_by_event_id(&self, event_id: &EventId) -> StoreResult<Option<Grant>> {
        (**self).find_by_event_id(event_id)
    }

    fn get(&self, id: &GrantId) -> StoreResult<Option<Grant>> {
        (**self).get(id)
    }

    fn grant_count(&self) -> StoreResult<u64> {
        (**self).grant_count()
    }
}

impl<T: GrantStore + ?Sized> GrantStore for std::sync::Arc<T> {
    fn append(&self, grant: &Grant) -> StoreResult<Grant> {
        (**self).append(grant)
    }

    fn list_by_user(&self, user: &UserId) -> StoreResult<Vec<Grant>> {
        (**self).list_by_user(user)
    }

    fn find_by_event_id(&self, event_id: &EventId) -> StoreResult<Option<Grant>> {
        (**self).find_by_event_id(event_id)
    }

    fn get(&self, id: &GrantId) -> StoreResult<Option<Grant>> {
        (**self).get(id)
    }

    fn grant_count(&self) -> StoreResult<u64> {
        (**self).grant_count()
    }
}
