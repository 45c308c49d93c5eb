//! EIP-6963 provider descriptor.

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Dispatched by wallets to announce themselves.
pub const ANNOUNCE_PROVIDER_EVENT: &str = "eip6963:announceProvider";
/// Dispatched by dapps to ask wallets to (re-)announce.
pub const REQUEST_PROVIDER_EVENT: &str = "eip6963:requestProvider";
/// Legacy readiness event fired once `window.ethereum` is installed.
pub const ETHEREUM_INITIALIZED_EVENT: &str = "ethereum#initialized";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Data URI of the wallet icon.
    pub icon: String,
    pub name: String,
    /// Reverse-DNS identifier (`com.example.wallet`).
    pub rdns: String,
    /// Per-session UUIDv4.
    pub uuid: String,
}

impl ProviderInfo {
    pub fn validate(&self) -> Result<()> {
        if !self.icon.starts_with("data:") {
            return Err(BridgeError::InvalidParams("icon must be a data URI".into()));
        }
        if self.name.trim().is_empty() {
            return Err(BridgeError::InvalidParams("name must not be empty".into()));
        }
        if self.rdns.split('.').filter(|p| !p.is_empty()).count() < 2 {
            return Err(BridgeError::InvalidParams(format!(
                "rdns must be reverse-DNS: {}",
                self.rdns
            )));
        }
        if self.uuid.is_empty() {
            return Err(BridgeError::InvalidParams("uuid must not be empty".into()));
        }
        Ok(())
    }
}
