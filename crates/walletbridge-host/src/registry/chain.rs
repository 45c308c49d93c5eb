//! Known chains and their RPC endpoints.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::config::ChainConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEntry {
    pub chain_id: u64,
    pub rpc_url: String,
    pub supported: bool,
}

impl From<&ChainConfig> for ChainEntry {
    fn from(c: &ChainConfig) -> Self {
        Self {
            chain_id: c.chain_id,
            rpc_url: c.rpc_url.clone(),
            supported: c.supported,
        }
    }
}

pub struct ChainRegistry {
    chains: DashMap<u64, ChainEntry>,
    default_chain_id: u64,
}

impl ChainRegistry {
    pub fn new(entries: impl IntoIterator<Item = ChainEntry>, default_chain_id: u64) -> Self {
        let chains = DashMap::new();
        for e in entries {
            chains.insert(e.chain_id, e);
        }
        Self {
            chains,
            default_chain_id,
        }
    }

    pub fn from_config(chains: &[ChainConfig], default_chain_id: u64) -> Self {
        Self::new(chains.iter().map(ChainEntry::from), default_chain_id)
    }

    pub fn default_chain_id(&self) -> u64 {
        self.default_chain_id
    }

    pub fn get(&self, chain_id: u64) -> Option<ChainEntry> {
        self.chains.get(&chain_id).map(|e| e.value().clone())
    }

    pub fn is_supported(&self, chain_id: u64) -> bool {
        self.chains.get(&chain_id).map(|e| e.supported).unwrap_or(false)
    }

    pub fn rpc_url(&self, chain_id: u64) -> Option<String> {
        self.chains.get(&chain_id).map(|e| e.rpc_url.clone())
    }

    /// Point a known chain at a new RPC endpoint. Unknown chains are left
    /// alone; adding one goes through [`ChainRegistry::add_chain`].
    pub fn add_rpc(&self, chain_id: u64, rpc_url: &str) -> bool {
        match self.chains.get_mut(&chain_id) {
            Some(mut e) => {
                e.rpc_url = rpc_url.to_string();
                true
            }
            None => false,
        }
    }

    /// Insert or replace.
    pub fn add_chain(&self, entry: ChainEntry) {
        tracing::info!(chain_id = entry.chain_id, supported = entry.supported, "chain registered");
        self.chains.insert(entry.chain_id, entry);
    }

    pub fn supported_chain_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .chains
            .iter()
            .filter(|e| e.supported)
            .map(|e| *e.key())
            .collect();
        ids.sort_unstable();
        ids
    }
}
