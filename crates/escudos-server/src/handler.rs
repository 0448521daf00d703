use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use escudos_ledger::{BalanceSummary, HistoryView, IssueRequest, Issued, LedgerError, LedgerService};
use escudos_store::GrantStore;
use escudos_types::{EventId, Grant, UserId};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{ServerError, ServerResult};

/// Ledger handle shared by all handlers.
pub type SharedLedger = Arc<LedgerService<Box<dyn GrantStore>>>;

/// Confirmed subscription payment, as forwarded by the payment webhook.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubscriptionPayment {
    /// The provider's native event id; the idempotency key.
    pub event_id: EventId,
    pub user_id: UserId,
    pub amount: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManualGrantRequest {
    pub amount: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IssueResponse {
    pub grant: Grant,
    pub replayed: bool,
}

impl From<Issued> for IssueResponse {
    fn from(issued: Issued) -> Self {
        let replayed = issued.was_replayed();
        Self {
            grant: issued.into_grant(),
            replayed,
        }
    }
}

/// Run a ledger call on the blocking pool so store I/O never stalls the runtime.
async fn blocking<T, F>(ledger: SharedLedger, call: F) -> ServerResult<T>
where
    T: Send + 'static,
    F: FnOnce(&LedgerService<Box<dyn GrantStore>>) -> Result<T, LedgerError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || call(&ledger))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
        .map_err(ServerError::from)
}

/// Health check handler.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Info handler.
pub async fn info_handler(State(ledger): State<SharedLedger>) -> ServerResult<Json<serde_json::Value>> {
    let grants = blocking(ledger, |l| l.grant_count()).await?;
    Ok(Json(json!({
        "name": "escudos-server",
        "version": env!("CARGO_PKG_VERSION"),
        "grants": grants,
    })))
}

/// Subscription payment webhook. A repeated delivery answers 200 with the
/// originally recorded grant.
pub async fn subscription_payment_handler(
    State(ledger): State<SharedLedger>,
    payload: Result<Json<SubscriptionPayment>, JsonRejection>,
) -> ServerResult<Json<IssueResponse>> {
    let Json(payment) = payload?;
    let request = IssueRequest::subscription(payment.user_id, payment.amount, payment.event_id);
    let issued = blocking(ledger, move |l| l.issue(request)).await?;
    Ok(Json(issued.into()))
}

/// Admin-issued manual grant.
pub async fn manual_grant_handler(
    State(ledger): State<SharedLedger>,
    Path(user_id): Path<UserId>,
    payload: Result<Json<ManualGrantRequest>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<IssueResponse>)> {
    let Json(body) = payload?;
    let request = IssueRequest::manual(user_id, body.amount);
    let issued = blocking(ledger, move |l| l.issue(request)).await?;
    Ok((StatusCode::CREATED, Json(issued.into())))
}

pub async fn balance_handler(
    State(ledger): State<SharedLedger>,
    Path(user_id): Path<UserId>,
) -> ServerResult<Json<BalanceSummary>> {
    let summary = blocking(ledger, move |l| l.balance_summary(&user_id)).await?;
    Ok(Json(summary))
}

pub async fn history_handler(
    State(ledger): State<SharedLedger>,
    Path(user_id): Path<UserId>,
) -> ServerResult<Json<HistoryView>> {
    let view = blocking(ledger, move |l| l.history_view(&user_id)).await?;
    Ok(Json(view))
}
