//! EIP-1193 request/response shapes.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{BridgeError, Result, RpcError};

/// Positional params. EIP-747 style object params (`wallet_watchAsset`)
/// become a one-element list; `null` means absent.
fn params_compat<'de, D>(de: D) -> std::result::Result<Option<Vec<Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(de)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(obj @ Value::Object(_)) => Ok(Some(vec![obj])),
        Some(other) => Err(serde::de::Error::custom(format!(
            "params must be an array or object, got {other}"
        ))),
    }
}

/// Arguments of `provider.request(..)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestArguments {
    pub method: String,
    #[serde(default, deserialize_with = "params_compat", skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Value>>,
}

impl RequestArguments {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: None,
        }
    }

    pub fn with_params(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params: Some(params),
        }
    }
}

/// Request as it leaves the injected provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRequest {
    pub id: u64,
    pub method: String,
    #[serde(default, deserialize_with = "params_compat", skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Value>>,
}

impl ProviderRequest {
    /// Positional param, `None` when absent.
    pub fn param(&self, idx: usize) -> Option<&Value> {
        self.params.as_ref().and_then(|p| p.get(idx))
    }
}

/// Exactly one of `result` / `error` is meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl ProviderResponse {
    pub fn ok(id: u64, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: u64, error: &BridgeError) -> Self {
        Self {
            id,
            result: None,
            error: Some(error.to_rpc()),
        }
    }

    pub fn from_result(id: u64, res: Result<Value>) -> Self {
        match res {
            Ok(v) => Self::ok(id, v),
            Err(e) => Self::err(id, &e),
        }
    }
}

/// Legacy `send(methodOrPayload, paramsOrCallback)` call forms.
#[derive(Debug, Clone, PartialEq)]
pub enum LegacyCall {
    /// `send("eth_accounts", [])`
    Method { method: String, params: Vec<Value> },
    /// `send({ method, params })`
    Payload(RequestArguments),
}

impl LegacyCall {
    /// Normalize the dual JS signature from raw JSON arguments.
    ///
    /// A string first argument paired with an array is the `(method, params)`
    /// form; anything else must be a request payload object.
    pub fn from_args(method_or_payload: Value, params_or_callback: Option<Value>) -> Result<Self> {
        match (method_or_payload, params_or_callback) {
            (Value::String(method), Some(Value::Array(params))) => {
                Ok(LegacyCall::Method { method, params })
            }
            (payload @ Value::Object(_), _) => {
                let args: RequestArguments = serde_json::from_value(payload)
                    .map_err(|e| BridgeError::InvalidParams(format!("invalid request payload: {e}")))?;
                Ok(LegacyCall::Payload(args))
            }
            (Value::String(method), _) => Ok(LegacyCall::Payload(RequestArguments::new(method))),
            (other, _) => Err(BridgeError::InvalidParams(format!(
                "expected method name or request object, got {other}"
            ))),
        }
    }

    pub fn into_arguments(self) -> RequestArguments {
        match self {
            LegacyCall::Method { method, params } => RequestArguments::with_params(method, params),
            LegacyCall::Payload(args) => args,
        }
    }
}
