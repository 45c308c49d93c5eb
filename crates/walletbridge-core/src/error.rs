//! Shared error type across walletbridge crates.
//!
//! Every failure that reaches a dapp is a JSON-RPC style `{code, message}`
//! pair. `BridgeError` is the in-process form, `RpcError` the wire form.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Provider-facing error codes (EIP-1193 / EIP-1474, stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The user rejected the request.
    UserRejected,
    /// The requested method/account has not been authorized.
    Unauthorized,
    /// The provider does not support the method.
    UnsupportedMethod,
    /// The provider is disconnected from the requesting context.
    Disconnected,
    /// The chain is not known to the wallet.
    ChainNotSupported,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
    /// Request limit exceeded.
    RateLimited,
}

impl ErrorCode {
    /// Numeric code used on the wire.
    pub fn as_i64(self) -> i64 {
        match self {
            ErrorCode::UserRejected => 4001,
            ErrorCode::Unauthorized => 4100,
            ErrorCode::UnsupportedMethod => 4200,
            ErrorCode::Disconnected => 4900,
            ErrorCode::ChainNotSupported => 4902,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
            ErrorCode::RateLimited => -32005,
        }
    }

    /// Symbolic name, used in logs and metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::UserRejected => "USER_REJECTED",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::UnsupportedMethod => "UNSUPPORTED_METHOD",
            ErrorCode::Disconnected => "DISCONNECTED",
            ErrorCode::ChainNotSupported => "CHAIN_NOT_SUPPORTED",
            ErrorCode::InvalidParams => "INVALID_PARAMS",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::RateLimited => "RATE_LIMITED",
        }
    }

    /// Reverse lookup for codes from the fixed table.
    pub fn from_i64(code: i64) -> Option<Self> {
        match code {
            4001 => Some(ErrorCode::UserRejected),
            4100 => Some(ErrorCode::Unauthorized),
            4200 => Some(ErrorCode::UnsupportedMethod),
            4900 => Some(ErrorCode::Disconnected),
            4902 => Some(ErrorCode::ChainNotSupported),
            -32602 => Some(ErrorCode::InvalidParams),
            -32603 => Some(ErrorCode::InternalError),
            -32005 => Some(ErrorCode::RateLimited),
            _ => None,
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Unified error type used by every crate in the workspace.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("User rejected the request")]
    UserRejected,
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("method not supported: {0}")]
    UnsupportedMethod(String),
    #[error("disconnected: {0}")]
    Disconnected(String),
    #[error("Chain not supported: {0}")]
    ChainNotSupported(u64),
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("rate limited")]
    RateLimited,
    #[error("internal: {0}")]
    Internal(String),
    #[error("config: {0}")]
    Config(String),
    /// Error returned verbatim by a passthrough RPC endpoint (or any remote
    /// peer whose code is outside the fixed table).
    #[error("{message}")]
    Rpc { code: i64, message: String },
}

impl BridgeError {
    /// Map to the numeric code surfaced to dapps.
    pub fn code(&self) -> i64 {
        match self {
            BridgeError::Rpc { code, .. } => *code,
            other => other.error_code().map(ErrorCode::as_i64).unwrap_or(-32603),
        }
    }

    /// Map to the fixed code table, `None` for verbatim RPC codes outside it.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            BridgeError::UserRejected => Some(ErrorCode::UserRejected),
            BridgeError::Unauthorized(_) => Some(ErrorCode::Unauthorized),
            BridgeError::UnsupportedMethod(_) => Some(ErrorCode::UnsupportedMethod),
            BridgeError::Disconnected(_) => Some(ErrorCode::Disconnected),
            BridgeError::ChainNotSupported(_) => Some(ErrorCode::ChainNotSupported),
            BridgeError::InvalidParams(_) => Some(ErrorCode::InvalidParams),
            BridgeError::RateLimited => Some(ErrorCode::RateLimited),
            BridgeError::Internal(_) | BridgeError::Config(_) => Some(ErrorCode::InternalError),
            BridgeError::Rpc { code, .. } => ErrorCode::from_i64(*code),
        }
    }

    /// Wire representation.
    pub fn to_rpc(&self) -> RpcError {
        RpcError {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// JSON-RPC error object as it travels across contexts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.as_i64(),
            message: message.into(),
        }
    }
}

impl From<RpcError> for BridgeError {
    /// Remote errors keep their code and message untouched.
    fn from(e: RpcError) -> Self {
        BridgeError::Rpc {
            code: e.code,
            message: e.message,
        }
    }
}

impl From<&BridgeError> for RpcError {
    fn from(e: &BridgeError) -> Self {
        e.to_rpc()
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::InvalidParams(e.to_string())
    }
}
