//! HTTP server for the escudos credit ledger.
//!
//! Wraps [`escudos_ledger::LedgerService`] in a small REST surface: the
//! subscription-payment webhook, admin manual grants, and balance/history
//! reads. Session and role checks live in front of this service and are not
//! handled here.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{IssueResponse, ManualGrantRequest, SharedLedger, SubscriptionPayment};
pub use server::EscudosServer;
