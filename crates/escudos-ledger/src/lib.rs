//! Entitlement ledger for escudos credits.
//!
//! Credits are granted to users by subscription payments or by manual admin
//! action. Each grant is immutable and carries its own expiry; a user's
//! balance is never stored but computed at read time from the grants that
//! are still valid at an explicit `now`.
//!
//! This crate provides:
//! - [`LedgerService`] -- issue grants, read balances and history
//! - [`IdempotencyGuard`] -- turns the store's unique-key conflict on
//!   `source_event_id` into an idempotent success
//! - [`ExpiryPolicy`] -- computes a grant's expiry from its source
//! - [`BalanceCalculator`] -- sums still-valid grants
//! - [`HistoryView`] -- display projection with a derived `is_expired` flag
//! - [`Clock`] -- injectable time source

pub mod balance;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod expiry;
pub mod history;
pub mod idempotency;
pub mod service;

pub use balance::{valid_balance, BalanceCalculator, BalanceSummary};
pub use cache::BalanceCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LedgerConfig;
pub use error::LedgerError;
pub use expiry::ExpiryPolicy;
pub use history::{HistoryEntry, HistoryView};
pub use idempotency::{IdempotencyGuard, Issued};
pub use service::{IssueRequest, LedgerService};
