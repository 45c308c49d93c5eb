use alloy::primitives::Address;
use dashmap::DashMap;
use serde_json::{json, Value};

use walletbridge_core::chain::to_hex;
use walletbridge_core::host::normalize_host;

/// One dapp host's connection to the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub host: String,
    pub address: Address,
    pub chain_id: u64,
}

impl Session {
    pub fn new(host: &str, address: Address, chain_id: u64) -> Self {
        Self {
            host: normalize_host(host),
            address,
            chain_id,
        }
    }

    /// `0x`-prefixed, lower-cased. This is what dapps see.
    pub fn address_lower(&self) -> String {
        format!("{:#x}", self.address)
    }

    pub fn to_json(&self) -> Value {
        json!({
            "host": self.host,
            "address": self.address_lower(),
            "chainId": to_hex(self.chain_id),
        })
    }
}

/// Sessions keyed by normalized host, at most one per host.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn get(&self, host: &str) -> Option<Session> {
        self.sessions.get(&normalize_host(host)).map(|s| s.value().clone())
    }

    /// Insert or replace. Returns the previous session, if any.
    pub fn set(&self, session: Session) -> Option<Session> {
        self.sessions.insert(session.host.clone(), session)
    }

    pub fn update_chain(&self, host: &str, chain_id: u64) -> Option<Session> {
        let mut s = self.sessions.get_mut(&normalize_host(host))?;
        s.chain_id = chain_id;
        Some(s.clone())
    }

    pub fn update_address(&self, host: &str, address: Address) -> Option<Session> {
        let mut s = self.sessions.get_mut(&normalize_host(host))?;
        s.address = address;
        Some(s.clone())
    }

    pub fn remove(&self, host: &str) -> Option<Session> {
        self.sessions.remove(&normalize_host(host)).map(|(_, s)| s)
    }

    /// Drop every session, returning what was removed.
    pub fn clear(&self) -> Vec<Session> {
        let hosts: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        hosts.into_iter().filter_map(|h| self.remove(&h)).collect()
    }

    /// Snapshot ordered by host.
    pub fn list(&self) -> Vec<Session> {
        let mut out: Vec<Session> = self.sessions.iter().map(|e| e.value().clone()).collect();
        out.sort_by(|a, b| a.host.cmp(&b.host));
        out
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
