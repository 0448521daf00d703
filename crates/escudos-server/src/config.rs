use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use escudos_ledger::LedgerConfig;
use escudos_store::SyncMode;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Grant log location. Grants are kept in memory only when unset.
    pub data_path: Option<PathBuf>,
    pub sync: SyncMode,
    pub ledger: LedgerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8088)),
            data_path: None,
            sync: SyncMode::default(),
            ledger: LedgerConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ServerResult<()> {
        self.ledger.validate().map_err(ServerError::Config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:8088".parse::<SocketAddr>().unwrap());
        assert!(c.data_path.is_none());
        assert_eq!(c.sync, SyncMode::EveryWrite);
        assert_eq!(c.ledger.subscription_validity_months, 12);
    }

    #[test]
    fn parse_toml() {
        let c = ServerConfig::from_toml(
            r#"
            bind_addr = "0.0.0.0:9000"
            data_path = "/var/lib/escudos/grants.log"
            sync = "os-default"

            [ledger]
            manual_validity_months = 24
            balance_cache_ttl_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(c.bind_addr.port(), 9000);
        assert_eq!(c.data_path, Some(PathBuf::from("/var/lib/escudos/grants.log")));
        assert_eq!(c.sync, SyncMode::OsDefault);
        assert_eq!(c.ledger.subscription_validity_months, 12);
        assert_eq!(c.ledger.manual_validity_months, Some(24));
        assert_eq!(c.ledger.balance_cache_ttl_secs, Some(30));
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(ServerConfig::from_toml("").unwrap(), ServerConfig::default());
    }

    #[test]
    fn invalid_ledger_window_rejected() {
        let err = ServerConfig::from_toml("[ledger]\nsubscription_validity_months = 0\n").unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("escudos.toml");
        std::fs::write(&path, "bind_addr = \"127.0.0.1:7000\"\n").unwrap();
        assert_eq!(ServerConfig::load(&path).unwrap().bind_addr.port(), 7000);
    }
}
