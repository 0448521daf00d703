use std::collections::HashMap;

use escudos_types::{EventId, Grant, GrantId, UserId};

use crate::error::{StoreError, StoreResult};

/// In-memory grant table with its lookup indexes.
///
/// Shared by every backend. The file-backed store rebuilds one from its log
/// on open and keeps it in step with each durable append.
#[derive(Debug, Default)]
pub struct GrantIndex {
    grants: Vec<Grant>,
    by_id: HashMap<GrantId, usize>,
    by_user: HashMap<UserId, Vec<usize>>,
    by_event: HashMap<EventId, usize>,
}

impl GrantIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the uniqueness constraints without inserting.
    ///
    /// Callers must hold the exclusive lock across `check` and `insert`.
    pub fn check(&self, grant: &Grant) -> StoreResult<()> {
        if let Some(event_id) = &grant.source_event_id {
            if self.by_event.contains_key(event_id) {
                return Err(StoreError::DuplicateEvent {
                    event_id: event_id.clone(),
                });
            }
        }
        if self.by_id.contains_key(&grant.id) {
            return Err(StoreError::DuplicateGrantId(grant.id));
        }
        Ok(())
    }

    /// Insert a grant that already passed [`GrantIndex::check`].
    pub fn insert(&mut self, grant: Grant) {
        let position = self.grants.len();
        self.by_id.insert(grant.id, position);
        self.by_user
            .entry(grant.user_id.clone())
            .or_default()
            .push(position);
        if let Some(event_id) = &grant.source_event_id {
            self.by_event.insert(event_id.clone(), position);
        }
        self.grants.push(grant);
    }

    /// Check and insert in one step.
    pub fn try_insert(&mut self, grant: Grant) -> StoreResult<()> {
        self.check(&grant)?;
        self.insert(grant);
        Ok(())
    }

    pub fn list_by_user(&self, user: &UserId) -> Vec<Grant> {
        self.by_user
            .get(user)
            .map(|positions| positions.iter().map(|&p| self.grants[p].clone()).collect())
            .unwrap_or_default()
    }

    pub fn find_by_event_id(&self, event_id: &EventId) -> Option<Grant> {
        self.by_event.get(event_id).map(|&p| self.grants[p].clone())
    }

    pub fn get(&self, id: &GrantId) -> Option<Grant> {
        self.by_id.get(id).map(|&p| self.grants[p].clone())
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use escudos_types::GrantSource;

    fn grant(user: &str, event: Option<&str>) -> Grant {
        Grant {
            id: GrantId::new(),
            user_id: UserId::new(user).unwrap(),
            amount: 5,
            source: GrantSource::Manual,
            issued_at: Utc::now(),
            expires_at: None,
            source_event_id: event.map(|e| EventId::new(e).unwrap()),
        }
    }

    #[test]
    fn indexes_by_user_and_event() {
        let mut index = GrantIndex::new();
        let a = grant("alice", Some("evt_1"));
        let b = grant("alice", None);
        let c = grant("bob", None);
        index.try_insert(a.clone()).unwrap();
        index.try_insert(b.clone()).unwrap();
        index.try_insert(c).unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(
            index.list_by_user(&UserId::new("alice").unwrap()),
            vec![a.clone(), b]
        );
        assert_eq!(
            index.find_by_event_id(&EventId::new("evt_1").unwrap()),
            Some(a.clone())
        );
        assert_eq!(index.get(&a.id), Some(a));
    }

    #[test]
    fn rejects_duplicate_event_id() {
        let mut index = GrantIndex::new();
        index.try_insert(grant("alice", Some("evt_1"))).unwrap();
        let err = index.try_insert(grant("bob", Some("evt_1"))).unwrap_err();
        assert!(err.is_duplicate_event());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn rejects_duplicate_grant_id() {
        let mut index = GrantIndex::new();
        let g = grant("alice", None);
        index.try_insert(g.clone()).unwrap();
        let err = index.try_insert(g.clone()).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateGrantId(id) if id == g.id));
    }

    #[test]
    fn unknown_user_lists_nothing() {
        let index = GrantIndex::new();
        assert!(index.is_empty());
        assert!(index.list_by_user(&UserId::new("ghost").unwrap()).is_empty());
    }
}
