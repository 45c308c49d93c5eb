//! Chain id helpers.
//!
//! Dapps speak hex (`"0x89"`), registries key by integer (`137`). Parsing
//! accepts both forms since wallets in the wild send either.

use serde_json::Value;

use crate::error::{BridgeError, Result};

/// Chain answered by `eth_chainId` when the host has no session.
pub const DEFAULT_CHAIN_ID: u64 = 1;

/// `137` -> `"0x89"`.
pub fn to_hex(chain_id: u64) -> String {
    format!("0x{chain_id:x}")
}

/// Parse `"0x89"` or `"137"`.
pub fn parse_chain_id(s: &str) -> Result<u64> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) if !hex.is_empty() => u64::from_str_radix(hex, 16),
        Some(_) => return Err(BridgeError::InvalidParams(format!("invalid chainId: {s}"))),
        None => s.parse::<u64>(),
    };
    parsed.map_err(|_| BridgeError::InvalidParams(format!("invalid chainId: {s}")))
}

/// Parse a chain id from a JSON string or number.
pub fn chain_id_from_value(v: &Value) -> Result<u64> {
    match v {
        Value::String(s) => parse_chain_id(s),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| BridgeError::InvalidParams(format!("invalid chainId: {n}"))),
        other => Err(BridgeError::InvalidParams(format!(
            "chainId must be a string or number, got {other}"
        ))),
    }
}

/// Decimal `networkVersion` for a hex chain id; `None` when not hex.
pub fn network_version(hex_chain_id: &str) -> Option<String> {
    let digits = hex_chain_id.strip_prefix("0x").unwrap_or(hex_chain_id);
    u64::from_str_radix(digits, 16).ok().map(|n| n.to_string())
}
