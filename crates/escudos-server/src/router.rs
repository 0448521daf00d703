use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, SharedLedger};

/// Build the axum router with all escudos endpoints.
pub fn build_router(ledger: SharedLedger) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route(
            "/v1/webhooks/subscription-payment",
            post(handler::subscription_payment_handler),
        )
        .route("/v1/users/:user_id/grants", post(handler::manual_grant_handler))
        .route("/v1/users/:user_id/balance", get(handler::balance_handler))
        .route("/v1/users/:user_id/history", get(handler::history_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(ledger)
}
