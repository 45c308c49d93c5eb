//! Host config loader (strict parsing).

pub mod schema;

use std::fs;

use walletbridge_core::{BridgeError, Result};

pub use schema::{
    ChainConfig, HostConfig, PushSection, RateLimitSection, RpcSection, ServerSection,
};

pub fn load_from_file(path: &str) -> Result<HostConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| BridgeError::Config(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<HostConfig> {
    let cfg: HostConfig =
        serde_yaml::from_str(s).map_err(|e| BridgeError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
