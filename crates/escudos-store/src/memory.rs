use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use escudos_types::{EventId, Grant, GrantId, UserId};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::index::GrantIndex;
use crate::traits::GrantStore;

/// In-memory grant store.
///
/// Intended for tests and embedding. All grants are held behind a `RwLock`;
/// appends take the write lock for the whole check-and-insert, reads share
/// the read lock. Grants are cloned on read/write.
pub struct InMemoryGrantStore {
    inner: RwLock<GrantIndex>,
}

impl InMemoryGrantStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(GrantIndex::new()),
        }
    }

    fn read_index(&self) -> StoreResult<RwLockReadGuard<'_, GrantIndex>> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write_index(&self) -> StoreResult<RwLockWriteGuard<'_, GrantIndex>> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl Default for InMemoryGrantStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GrantStore for InMemoryGrantStore {
    fn append(&self, grant: &Grant) -> StoreResult<Grant> {
        let mut index = self.write_index()?;
        index.try_insert(grant.clone())?;
        debug!(grant = %grant.id, user = %grant.user_id, amount = grant.amount, "grant appended");
        Ok(grant.clone())
    }

    fn list_by_user(&self, user: &UserId) -> StoreResult<Vec<Grant>> {
        Ok(self.read_index()?.list_by_user(user))
    }

    fn find_by_event_id(&self, event_id: &EventId) -> StoreResult<Option<Grant>> {
        Ok(self.read_index()?.find_by_event_id(event_id))
    }

    fn get(&self, id: &GrantId) -> StoreResult<Option<Grant>> {
        Ok(self.read_index()?.get(id))
    }

    fn grant_count(&self) -> StoreResult<u64> {
        Ok(self.read_index()?.len() as u64)
    }
}

impl std::fmt::Debug for InMemoryGrantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.inner.read().map(|index| index.len()).unwrap_or(0);
        f.debug_struct("InMemoryGrantStore")
            .field("grant_count", &count)
            .finish()
    }
}
