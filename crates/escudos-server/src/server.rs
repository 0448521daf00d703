use std::sync::Arc;

use escudos_ledger::LedgerService;
use escudos_store::{FileGrantStore, GrantStore, InMemoryGrantStore};
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::SharedLedger;
use crate::router::build_router;

/// Escudos ledger server.
pub struct EscudosServer {
    config: ServerConfig,
    ledger: SharedLedger,
}

impl EscudosServer {
    /// Open the configured store and build the ledger.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        let store: Box<dyn GrantStore> = match &config.data_path {
            Some(path) => Box::new(
                FileGrantStore::open(path, config.sync)
                    .map_err(|e| ServerError::Ledger(e.into()))?,
            ),
            None => {
                tracing::warn!("no data_path configured; grants are kept in memory only");
                Box::new(InMemoryGrantStore::new())
            }
        };
        let ledger = Arc::new(LedgerService::new(store, &config.ledger));
        Ok(Self { config, ledger })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(Arc::clone(&self.ledger))
    }

    /// Start serving requests until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "escudos server listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
