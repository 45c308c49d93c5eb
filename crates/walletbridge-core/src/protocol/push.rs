//! Host-scoped push events (background -> page).
//!
//! Pushes are not replies to outstanding requests. They are addressed by
//! topic `"{kind}:{host}"` so only pages of that origin receive them.

use serde_json::{json, Value};

use crate::chain::to_hex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushKind {
    AccountsChanged,
    ChainChanged,
    Connect,
    Disconnect,
}

impl PushKind {
    pub const ALL: [PushKind; 4] = [
        PushKind::AccountsChanged,
        PushKind::ChainChanged,
        PushKind::Connect,
        PushKind::Disconnect,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PushKind::AccountsChanged => "accountsChanged",
            PushKind::ChainChanged => "chainChanged",
            PushKind::Connect => "connect",
            PushKind::Disconnect => "disconnect",
        }
    }

    /// `accountsChanged:app.example`
    pub fn topic(self, host: &str) -> String {
        format!("{}:{host}", self.as_str())
    }
}

/// Session change pushed to every page context of one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    AccountsChanged { address: String },
    ChainChanged { chain_id: u64 },
    Connect { address: String, chain_id: u64 },
    Disconnect,
}

impl PushEvent {
    pub fn kind(&self) -> PushKind {
        match self {
            PushEvent::AccountsChanged { .. } => PushKind::AccountsChanged,
            PushEvent::ChainChanged { .. } => PushKind::ChainChanged,
            PushEvent::Connect { .. } => PushKind::Connect,
            PushEvent::Disconnect => PushKind::Disconnect,
        }
    }

    pub fn topic(&self, host: &str) -> String {
        self.kind().topic(host)
    }

    /// Payload as the page-side handlers expect it: an address string, a
    /// numeric chain id, `{address, chainId}` (hex) or `null`.
    pub fn payload(&self) -> Value {
        match self {
            PushEvent::AccountsChanged { address } => json!(address),
            PushEvent::ChainChanged { chain_id } => json!(chain_id),
            PushEvent::Connect { address, chain_id } => json!({
                "address": address,
                "chainId": to_hex(*chain_id),
            }),
            PushEvent::Disconnect => Value::Null,
        }
    }
}
