use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection settings for one depot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL, e.g. `https://bldr.example.com`. Trailing slashes are ignored.
    pub url: String,
    #[serde(default, alias = "authToken", skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub timeouts: ClientTimeouts,
}

impl RegistryConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), auth_token: None, timeouts: ClientTimeouts::default() }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}

/// Per-call timeouts, in seconds.
///
/// Listings and key metadata are small and answered fast; package records
/// and existence probes hit the depot database; artifact transfers move
/// whole packages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientTimeouts {
    #[serde(default = "default_listing_secs")]
    pub listing_secs: u64,
    #[serde(default = "default_package_secs")]
    pub package_secs: u64,
    #[serde(default = "default_transfer_secs")]
    pub transfer_secs: u64,
}

fn default_listing_secs() -> u64 {
    2
}

fn default_package_secs() -> u64 {
    30
}

fn default_transfer_secs() -> u64 {
    300
}

impl Default for ClientTimeouts {
    fn default() -> Self {
        Self {
            listing_secs: default_listing_secs(),
            package_secs: default_package_secs(),
            transfer_secs: default_transfer_secs(),
        }
    }
}

impl ClientTimeouts {
    pub fn listing(&self) -> Duration {
        Duration::from_secs(self.listing_secs)
    }

    pub fn package(&self) -> Duration {
        Duration::from_secs(self.package_secs)
    }

    pub fn transfer(&self) -> Duration {
        Duration::from_secs(self.transfer_secs)
    }
}
