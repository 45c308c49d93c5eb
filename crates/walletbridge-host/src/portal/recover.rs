//! `personal_ecRecover`.

use alloy::primitives::{hex, PrimitiveSignature};
use serde_json::Value;

use walletbridge_core::{BridgeError, Result};

/// `0x`-hex messages are raw bytes; anything else is UTF-8 text.
fn message_bytes(message: &str) -> Result<Vec<u8>> {
    match message.strip_prefix("0x") {
        Some(h) => hex::decode(h)
            .map_err(|e| BridgeError::InvalidParams(format!("invalid hex message: {e}"))),
        None => Ok(message.as_bytes().to_vec()),
    }
}

/// Recover the EIP-191 signer of `params = [message, signature]`.
/// Returns the lower-case `0x` address, the form session reads use.
pub fn ec_recover(params: &[Value]) -> Result<String> {
    let message = params
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| BridgeError::InvalidParams("message must be a string".into()))?;
    let signature = params
        .get(1)
        .and_then(Value::as_str)
        .ok_or_else(|| BridgeError::InvalidParams("signature must be a hex string".into()))?;

    let sig_bytes = hex::decode(signature)
        .map_err(|e| BridgeError::InvalidParams(format!("invalid signature hex: {e}")))?;
    let sig = PrimitiveSignature::from_raw(&sig_bytes)
        .map_err(|e| BridgeError::InvalidParams(format!("invalid signature: {e}")))?;

    let address = sig
        .recover_address_from_msg(message_bytes(message)?)
        .map_err(|e| BridgeError::InvalidParams(format!("signature recovery failed: {e}")))?;
    Ok(format!("{address:#x}"))
}
