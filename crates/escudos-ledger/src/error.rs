use escudos_store::StoreError;
use escudos_types::{EventId, TypeError};

/// Errors produced by ledger operations.
///
/// An empty ledger is a valid state: balance and history reads for a user
/// without grants return zero and an empty list, never an error.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("grant amount must be positive, got {amount}")]
    InvalidAmount { amount: i64 },

    #[error("invalid input: {0}")]
    InvalidInput(#[from] TypeError),

    /// Only produced by [`crate::IdempotencyGuard::ensure_not_duplicate`];
    /// `issue` absorbs duplicates instead.
    #[error("event {event_id} was already applied")]
    DuplicateEvent { event_id: EventId },

    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),
}

impl LedgerError {
    /// Whether the caller sent bad input (as opposed to a storage failure).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidAmount { .. } | Self::InvalidInput(_))
    }
}
