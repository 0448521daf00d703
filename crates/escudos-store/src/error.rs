use std::path::PathBuf;

use escudos_types::{EventId, GrantId};

/// Errors from grant store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A grant with the same idempotency key already exists.
    #[error("a grant for event {event_id} already exists")]
    DuplicateEvent { event_id: EventId },

    /// A grant with the same id already exists.
    #[error("grant id {0} already exists")]
    DuplicateGrantId(GrantId),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Another handle already holds the log file.
    #[error("grant log {} is locked by another process: {reason}", path.display())]
    Locked { path: PathBuf, reason: String },

    /// The store's indexes disagree with each other.
    #[error("store inconsistency: {0}")]
    Inconsistent(String),

    /// A writer panicked while holding the store lock.
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Whether this error is the idempotency conflict on `source_event_id`.
    pub fn is_duplicate_event(&self) -> bool {
        matches!(self, Self::DuplicateEvent { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
