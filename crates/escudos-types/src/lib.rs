//! Foundation types for the escudos credit ledger.
//!
//! Every other escudos crate depends on `escudos-types`.
//!
//! # Key Types
//!
//! - [`Grant`] -- Immutable record of credits issued to a user
//! - [`GrantId`] -- UUID v7 grant identifier
//! - [`UserId`] -- Opaque platform user key
//! - [`EventId`] -- External idempotency key (payment-provider event id)
//! - [`GrantSource`] -- Where a grant came from, which drives its expiry

pub mod error;
pub mod grant;
pub mod ids;
pub mod source;

pub use error::TypeError;
pub use grant::Grant;
pub use ids::{EventId, GrantId, UserId};
pub use source::GrantSource;
