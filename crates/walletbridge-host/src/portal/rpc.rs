//! Passthrough RPC capability.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use walletbridge_core::{BridgeError, Result, RpcError};

/// Executes a JSON-RPC call against one chain's endpoint. Remote `error`
/// objects come back verbatim as [`BridgeError::Rpc`].
#[async_trait]
pub trait RpcClient: Send + Sync {
    async fn request(
        &self,
        chain_id: u64,
        rpc_url: &str,
        method: &str,
        params: Option<Vec<Value>>,
    ) -> Result<Value>;
}

#[derive(Debug, Deserialize)]
struct JsonRpcReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

pub struct HttpRpcClient {
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Config(format!("http client init failed: {e}")))?;
        Ok(Self {
            http,
            next_id: AtomicU64::new(1),
        })
    }
}

#[async_trait]
impl RpcClient for HttpRpcClient {
    async fn request(
        &self,
        chain_id: u64,
        rpc_url: &str,
        method: &str,
        params: Option<Vec<Value>>,
    ) -> Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params.unwrap_or_default(),
        });

        let resp = self
            .http
            .post(rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(chain_id, %method, error = %e, "rpc transport failed");
                BridgeError::Internal(format!("rpc request failed: {e}"))
            })?;

        let status = resp.status();
        let reply: JsonRpcReply = resp.json().await.map_err(|e| {
            tracing::error!(chain_id, %method, %status, error = %e, "rpc reply undecodable");
            BridgeError::Internal(format!("rpc reply undecodable ({status}): {e}"))
        })?;

        match reply.error {
            Some(err) => Err(BridgeError::from(err)),
            None => Ok(reply.result.unwrap_or(Value::Null)),
        }
    }
}
