//! Injected EIP-1193 provider.
//!
//! Requests get a per-instance id (strictly increasing from 0) and travel to
//! the portal host over the provider transport. Pushes from the host arrive
//! on host-scoped topics; each refreshes the cached state and is emitted to
//! subscribers in arrival order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use walletbridge_core::chain::{chain_id_from_value, network_version, to_hex, DEFAULT_CHAIN_ID};
use walletbridge_core::protocol::envelope::CorrelationId;
use walletbridge_core::protocol::push::PushKind;
use walletbridge_core::protocol::rpc::{LegacyCall, ProviderRequest, RequestArguments};
use walletbridge_core::{BridgeError, Result};
use walletbridge_transport::transport::{provider_transport, ProviderTransport};
use walletbridge_transport::Messenger;

use crate::lock_or_recover;

/// Events a dapp can listen for with `provider.on(..)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    Connect { chain_id: String },
    Disconnect,
    ChainChanged(String),
    AccountsChanged(Vec<String>),
}

impl ProviderEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderEvent::Connect { .. } => "connect",
            ProviderEvent::Disconnect => "disconnect",
            ProviderEvent::ChainChanged(_) => "chainChanged",
            ProviderEvent::AccountsChanged(_) => "accountsChanged",
        }
    }
}

/// What every provider on the page exposes, ours or not.
#[async_trait]
pub trait Eip1193Provider: Send + Sync {
    async fn request(&self, args: RequestArguments) -> Result<Value>;

    fn is_metamask(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone)]
struct ProviderState {
    chain_id: String,
    network_version: String,
    connected: bool,
    selected_address: Option<String>,
}

impl Default for ProviderState {
    fn default() -> Self {
        Self {
            chain_id: to_hex(DEFAULT_CHAIN_ID),
            network_version: DEFAULT_CHAIN_ID.to_string(),
            connected: false,
            selected_address: None,
        }
    }
}

struct Inner {
    transport: ProviderTransport,
    host: String,
    next_id: AtomicU64,
    state: Mutex<ProviderState>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<ProviderEvent>>>,
}

impl Inner {
    fn emit(&self, event: ProviderEvent) {
        tracing::debug!(host = %self.host, event = event.name(), "provider event");
        lock_or_recover(&self.subscribers).retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn set_chain(&self, chain_hex: &str) {
        let mut st = lock_or_recover(&self.state);
        st.chain_id = chain_hex.to_string();
        if let Some(nv) = network_version(chain_hex) {
            st.network_version = nv;
        }
    }

    fn on_push(&self, kind: PushKind, payload: Value) -> Result<()> {
        match kind {
            PushKind::AccountsChanged => {
                let address = payload.as_str().map(str::to_string);
                lock_or_recover(&self.state).selected_address = address.clone();
                self.emit(ProviderEvent::AccountsChanged(address.into_iter().collect()));
            }
            PushKind::ChainChanged => {
                let chain_hex = to_hex(chain_id_from_value(&payload)?);
                self.set_chain(&chain_hex);
                self.emit(ProviderEvent::ChainChanged(chain_hex));
            }
            PushKind::Connect => {
                let chain_hex = match payload.get("chainId") {
                    Some(v) => to_hex(chain_id_from_value(v)?),
                    None => lock_or_recover(&self.state).chain_id.clone(),
                };
                self.set_chain(&chain_hex);
                {
                    let mut st = lock_or_recover(&self.state);
                    st.connected = true;
                    if let Some(addr) = payload.get("address").and_then(Value::as_str) {
                        st.selected_address = Some(addr.to_string());
                    }
                }
                self.emit(ProviderEvent::Connect { chain_id: chain_hex });
            }
            PushKind::Disconnect => {
                {
                    let mut st = lock_or_recover(&self.state);
                    st.connected = false;
                    st.selected_address = None;
                }
                self.emit(ProviderEvent::Disconnect);
            }
        }
        Ok(())
    }
}

/// Page-side provider. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct InjectedProvider {
    inner: Arc<Inner>,
    is_metamask: bool,
}

impl InjectedProvider {
    /// Bind to `messenger` for the page at `host` (normalized dapp host).
    pub fn new(messenger: Arc<Messenger>, host: &str) -> Self {
        let inner = Arc::new(Inner {
            transport: provider_transport(Arc::clone(&messenger)),
            host: host.to_string(),
            next_id: AtomicU64::new(0),
            state: Mutex::new(ProviderState::default()),
            subscribers: Mutex::new(Vec::new()),
        });

        // Handlers hold a weak ref: the messenger must not keep the provider alive.
        for kind in PushKind::ALL {
            let weak: Weak<Inner> = Arc::downgrade(&inner);
            messenger.reply(&kind.topic(host), move |payload: Value, _meta| {
                let weak = weak.clone();
                async move {
                    if let Some(inner) = weak.upgrade() {
                        inner.on_push(kind, payload)?;
                    }
                    Ok(Value::Null)
                }
            });
        }

        Self {
            inner,
            is_metamask: true,
        }
    }

    /// Copy handed out through EIP-6963. Shares state, but does not claim to
    /// be MetaMask.
    pub fn announced_copy(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            is_metamask: false,
        }
    }

    pub fn host(&self) -> &str {
        &self.inner.host
    }

    pub async fn request(&self, args: RequestArguments) -> Result<Value> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let method = args.method;
        let req = ProviderRequest {
            id,
            method: method.clone(),
            params: args.params,
        };

        let resp = match self.inner.transport.send(&req, Some(CorrelationId::Num(id))).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!(id, %method, error = %e, "provider request failed in transit");
                return Err(BridgeError::Internal(e.to_string()));
            }
        };

        if resp.id != id {
            tracing::debug!(id, got = resp.id, %method, "response id mismatch; resolving null");
            return Ok(Value::Null);
        }
        if let Some(err) = resp.error {
            return Err(BridgeError::from(err));
        }
        let result = resp.result.unwrap_or(Value::Null);

        match method.as_str() {
            "eth_requestAccounts" => {
                if let Some(addr) = result.get(0).and_then(Value::as_str) {
                    let mut st = lock_or_recover(&self.inner.state);
                    st.selected_address = Some(addr.to_string());
                    st.connected = true;
                }
            }
            "eth_chainId" => {
                if let Some(chain_hex) = result.as_str() {
                    self.inner.set_chain(chain_hex);
                }
            }
            _ => {}
        }
        Ok(result)
    }

    pub async fn enable(&self) -> Result<Value> {
        self.request(RequestArguments::new("eth_requestAccounts")).await
    }

    /// Legacy `send(method, params)` / `send(payload)`.
    pub async fn send(&self, method_or_payload: Value, params: Option<Value>) -> Result<Value> {
        let args = LegacyCall::from_args(method_or_payload, params)?.into_arguments();
        self.request(args).await
    }

    /// Legacy `sendAsync(payload)`; answers in JSON-RPC response form.
    pub async fn send_async(&self, payload: Value) -> Result<Value> {
        let rpc_id = payload.get("id").cloned().unwrap_or(Value::Null);
        let args = LegacyCall::from_args(payload, None)?.into_arguments();
        let result = self.request(args).await?;
        Ok(json!({ "jsonrpc": "2.0", "id": rpc_id, "result": result }))
    }

    pub fn chain_id(&self) -> String {
        lock_or_recover(&self.inner.state).chain_id.clone()
    }

    pub fn network_version(&self) -> String {
        lock_or_recover(&self.inner.state).network_version.clone()
    }

    pub fn selected_address(&self) -> Option<String> {
        lock_or_recover(&self.inner.state).selected_address.clone()
    }

    pub fn is_connected(&self) -> bool {
        lock_or_recover(&self.inner.state).connected
    }

    /// Ordered event stream. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ProviderEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock_or_recover(&self.inner.subscribers).push(tx);
        rx
    }
}

#[async_trait]
impl Eip1193Provider for InjectedProvider {
    async fn request(&self, args: RequestArguments) -> Result<Value> {
        InjectedProvider::request(self, args).await
    }

    fn is_metamask(&self) -> bool {
        self.is_metamask
    }
}
