use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Origin of a grant. The source drives the grant's expiry window.
///
/// Serialized as its wire name; deserialization accepts any letter case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GrantSource {
    /// Issued by an administrator. No natural expiry.
    Manual,
    /// Issued from a confirmed recurring-payment event.
    Subscription,
}

impl GrantSource {
    pub const ALL: [GrantSource; 2] = [GrantSource::Manual, GrantSource::Subscription];

    /// Wire name of the source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "MANUAL",
            Self::Subscription => "SUBSCRIPTION",
        }
    }
}

impl FromStr for GrantSource {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MANUAL" => Ok(Self::Manual),
            "SUBSCRIPTION" => Ok(Self::Subscription),
            _ => Err(TypeError::UnknownSource(s.to_string())),
        }
    }
}

impl TryFrom<String> for GrantSource {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<GrantSource> for String {
    fn from(source: GrantSource) -> Self {
        source.as_str().to_string()
    }
}

impl fmt::Display for GrantSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
