//! Append-only grant storage for the escudos credit ledger.
//!
//! Grants are immutable once written and are never deleted. Every backend
//! enforces one uniqueness constraint: at most one grant per non-null
//! `source_event_id`. The check and the insert happen atomically under a
//! single exclusive lock, so concurrent deliveries of the same payment event
//! race safely: exactly one append wins and the others observe
//! [`StoreError::DuplicateEvent`].
//!
//! # Storage Backends
//!
//! All backends implement the [`GrantStore`] trait:
//!
//! - [`InMemoryGrantStore`] -- `RwLock`-guarded store for tests and embedding
//! - [`FileGrantStore`] -- length + CRC framed append-only log on disk,
//!   replayed into memory on open
//!
//! # Design Rules
//!
//! 1. Grants are immutable once written.
//! 2. Uniqueness of `source_event_id` is enforced by the store, never by a
//!    caller-side lookup.
//! 3. The durable write happens before a grant becomes visible to readers.
//! 4. Concurrent reads are always safe.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod index;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::{FileGrantStore, SyncMode};
pub use index::GrantIndex;
pub use memory::InMemoryGrantStore;
pub use traits::GrantStore;
