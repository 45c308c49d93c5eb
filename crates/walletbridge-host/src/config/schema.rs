use std::collections::HashSet;

use serde::Deserialize;
use walletbridge_core::chain::DEFAULT_CHAIN_ID;
use walletbridge_core::{BridgeError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default = "default_chain_id")]
    pub default_chain_id: u64,

    pub chains: Vec<ChainConfig>,

    #[serde(default)]
    pub rate_limit: RateLimitSection,

    #[serde(default)]
    pub push: PushSection,

    #[serde(default)]
    pub rpc: RpcSection,
}

impl HostConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(BridgeError::Config(format!(
                "unsupported config version: {}",
                self.version
            )));
        }
        self.server.validate()?;

        if self.chains.is_empty() {
            return Err(BridgeError::Config("chains must not be empty".into()));
        }
        let mut seen = HashSet::new();
        for c in &self.chains {
            if !seen.insert(c.chain_id) {
                return Err(BridgeError::Config(format!("duplicate chain_id: {}", c.chain_id)));
            }
            if c.rpc_url.trim().is_empty() {
                return Err(BridgeError::Config(format!(
                    "chains[{}].rpc_url must not be empty",
                    c.chain_id
                )));
            }
        }
        let default_ok = self
            .chains
            .iter()
            .any(|c| c.chain_id == self.default_chain_id && c.supported);
        if !default_ok {
            return Err(BridgeError::Config(format!(
                "default_chain_id {} must be a supported chain",
                self.default_chain_id
            )));
        }

        self.rate_limit.validate()?;
        self.push.validate()?;
        self.rpc.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        if !(5000..=120000).contains(&self.ping_interval_ms) {
            return Err(BridgeError::Config(
                "server.ping_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(BridgeError::Config(
                "server.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(BridgeError::Config(
                "server.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub rpc_url: String,
    #[serde(default = "yes")]
    pub supported: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitSection {
    #[serde(default = "yes")]
    pub enabled: bool,
    #[serde(default = "default_per_second")]
    pub per_second: u32,
    #[serde(default = "default_per_minute")]
    pub per_minute: u32,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            enabled: true,
            per_second: default_per_second(),
            per_minute: default_per_minute(),
        }
    }
}

impl RateLimitSection {
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.per_second == 0 || self.per_minute == 0 {
            return Err(BridgeError::Config("rate_limit windows must allow at least 1 request".into()));
        }
        if self.per_minute < self.per_second {
            return Err(BridgeError::Config(
                "rate_limit.per_minute must be >= per_second".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PushSection {
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
}

impl Default for PushSection {
    fn default() -> Self {
        Self {
            ack_timeout_ms: default_ack_timeout_ms(),
        }
    }
}

impl PushSection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=60000).contains(&self.ack_timeout_ms) {
            return Err(BridgeError::Config(
                "push.ack_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcSection {
    #[serde(default = "default_rpc_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RpcSection {
    fn default() -> Self {
        Self {
            timeout_ms: default_rpc_timeout_ms(),
        }
    }
}

impl RpcSection {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(BridgeError::Config("rpc.timeout_ms must be > 0".into()));
        }
        Ok(())
    }
}

fn yes() -> bool {
    true
}
fn default_chain_id() -> u64 {
    DEFAULT_CHAIN_ID
}
fn default_listen() -> String {
    "127.0.0.1:8545".into()
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}
fn default_per_second() -> u32 {
    10
}
fn default_per_minute() -> u32 {
    90
}
fn default_ack_timeout_ms() -> u64 {
    2000
}
fn default_rpc_timeout_ms() -> u64 {
    15000
}
