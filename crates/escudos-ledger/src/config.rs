use serde::{Deserialize, Serialize};

use crate::expiry::ExpiryPolicy;

/// Ledger configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Validity window of subscription grants, in calendar months.
    pub subscription_validity_months: u32,
    /// Validity window of manual grants. `None` means manual grants never expire.
    pub manual_validity_months: Option<u32>,
    /// TTL of the per-user balance cache. `None` disables the cache.
    pub balance_cache_ttl_secs: Option<u64>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            subscription_validity_months: 12,
            manual_validity_months: None,
            balance_cache_ttl_secs: None,
        }
    }
}

impl LedgerConfig {
    /// Check the settings, returning a description of the first problem.
    pub fn validate(&self) -> Result<(), String> {
        if self.subscription_validity_months == 0 {
            return Err("subscription_validity_months must be at least 1".into());
        }
        if self.manual_validity_months == Some(0) {
            return Err("manual_validity_months must be at least 1 when set".into());
        }
        if self.balance_cache_ttl_secs == Some(0) {
            return Err("balance_cache_ttl_secs must be at least 1 when set".into());
        }
        Ok(())
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy {
            subscription_validity_months: self.subscription_validity_months,
            manual_validity_months: self.manual_validity_months,
        }
    }
}
