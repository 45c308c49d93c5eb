//! Request/reply correlation over one channel.
//!
//! `send` posts `"> topic"` with a correlation id and parks a oneshot until
//! the matching `"< topic"` arrives. `reply` registers the handler that
//! answers inbound sends for a topic. Every handler invocation runs in its
//! own task, so a handler parked on user approval never stalls the pump.
//!
//! There is no implicit timeout on `send`. Callers that need a bound wrap it
//! in `tokio::time::timeout`.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use walletbridge_core::protocol::envelope::{
    decode_envelope, encode_envelope, CorrelationId, Direction, MessageEnvelope, ReplyPayload,
};
use walletbridge_core::{BridgeError, ErrorCode, Result, RpcError};

use crate::channel::{Channel, Frame, SenderInfo};

type ReplyResult = std::result::Result<Value, RpcError>;
type PendingKey = (String, CorrelationId);

/// Type-erased reply handler.
pub type Handler = Arc<dyn Fn(Value, ReplyMeta) -> BoxFuture<'static, ReplyResult> + Send + Sync>;

/// Context handed to a reply handler alongside the payload.
#[derive(Debug, Clone)]
pub struct ReplyMeta {
    pub topic: String,
    pub id: Option<CorrelationId>,
    pub sender: Option<SenderInfo>,
}

pub struct Messenger {
    name: String,
    channel: Arc<dyn Channel>,
    pending: DashMap<PendingKey, oneshot::Sender<ReplyResult>>,
    handlers: DashMap<String, Handler>,
    seq: AtomicU64,
    closed: AtomicBool,
}

/// Removes a pending entry when a `send` future is dropped before its reply.
struct PendingGuard<'a> {
    pending: &'a DashMap<PendingKey, oneshot::Sender<ReplyResult>>,
    key: PendingKey,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.key);
    }
}

impl Messenger {
    /// Wrap a channel and spawn the inbound pump.
    pub fn start(
        name: impl Into<String>,
        channel: Arc<dyn Channel>,
        inbound: mpsc::Receiver<Frame>,
    ) -> Arc<Self> {
        let messenger = Arc::new(Self {
            name: name.into(),
            channel,
            pending: DashMap::new(),
            handlers: DashMap::new(),
            seq: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        });
        tokio::spawn(Arc::clone(&messenger).pump(inbound));
        messenger
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the underlying channel currently exists.
    pub fn available(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && self.channel.is_open()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Typed send. Resolves only when the remote handler returns.
    pub async fn send<P, R>(&self, topic: &str, payload: &P, id: Option<CorrelationId>) -> Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let value = serde_json::to_value(payload)
            .map_err(|e| BridgeError::Internal(format!("payload encode failed: {e}")))?;
        let out = self.send_value(topic, value, id).await?;
        serde_json::from_value(out)
            .map_err(|e| BridgeError::Internal(format!("unexpected reply shape on {topic}: {e}")))
    }

    pub async fn send_value(&self, topic: &str, payload: Value, id: Option<CorrelationId>) -> Result<Value> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BridgeError::Disconnected(format!("{}: channel closed", self.name)));
        }

        let id = id.unwrap_or_else(|| {
            let n = self.seq.fetch_add(1, Ordering::Relaxed);
            CorrelationId::Str(format!("{}:{n}", self.name))
        });
        let key: PendingKey = (topic.to_string(), id.clone());

        let (tx, rx) = oneshot::channel();
        match self.pending.entry(key.clone()) {
            Entry::Occupied(_) => {
                return Err(BridgeError::Internal(format!(
                    "send already in flight: topic={topic} id={id}"
                )));
            }
            Entry::Vacant(v) => {
                v.insert(tx);
            }
        }
        let _guard = PendingGuard {
            pending: &self.pending,
            key,
        };

        if !self.available() {
            tracing::warn!(messenger = %self.name, %topic, %id, "channel unavailable; sending anyway");
        }

        let bytes = encode_envelope(&MessageEnvelope::send(topic, Some(id.clone()), payload))?;
        if let Err(e) = self.channel.post(Bytes::from(bytes)).await {
            tracing::error!(messenger = %self.name, %topic, %id, error = %e, "post failed");
            return Err(e);
        }

        match rx.await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e)) => Err(BridgeError::from(e)),
            Err(_) => Err(BridgeError::Disconnected(format!("{}: reply dropped", self.name))),
        }
    }

    /// Register a typed handler for inbound sends on `topic`.
    pub fn reply<P, R, F, Fut>(&self, topic: &str, handler: F)
    where
        P: DeserializeOwned + Send + 'static,
        R: Serialize + 'static,
        F: Fn(P, ReplyMeta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let erased: Handler = Arc::new(move |value: Value, meta: ReplyMeta| -> BoxFuture<'static, ReplyResult> {
            let handler = Arc::clone(&handler);
            Box::pin(async move {
                let payload: P = serde_json::from_value(value)
                    .map_err(|e| RpcError::new(ErrorCode::InvalidParams, e.to_string()))?;
                let out = handler(payload, meta).await.map_err(|e| e.to_rpc())?;
                serde_json::to_value(out).map_err(|e| RpcError::new(ErrorCode::InternalError, e.to_string()))
            })
        });
        self.reply_raw(topic, erased);
    }

    /// Register an untyped handler. The last registration for a topic wins.
    pub fn reply_raw(&self, topic: &str, handler: Handler) {
        if self.handlers.insert(topic.to_string(), handler).is_some() {
            tracing::warn!(messenger = %self.name, %topic, "reply handler replaced");
        }
    }

    pub fn remove_reply(&self, topic: &str) -> bool {
        self.handlers.remove(topic).is_some()
    }

    async fn pump(self: Arc<Self>, mut inbound: mpsc::Receiver<Frame>) {
        while let Some(frame) = inbound.recv().await {
            self.on_frame(frame);
        }
        self.closed.store(true, Ordering::Release);

        let keys: Vec<PendingKey> = self.pending.iter().map(|e| e.key().clone()).collect();
        if !keys.is_empty() {
            tracing::info!(messenger = %self.name, pending = keys.len(), "channel closed; failing pending sends");
        }
        for key in keys {
            if let Some((_, tx)) = self.pending.remove(&key) {
                let _ = tx.send(Err(RpcError::new(
                    ErrorCode::Disconnected,
                    format!("{}: channel closed", self.name),
                )));
            }
        }
    }

    fn on_frame(self: &Arc<Self>, frame: Frame) {
        let env = match decode_envelope(&frame.bytes) {
            Ok(env) => env,
            Err(e) => {
                tracing::warn!(messenger = %self.name, error = %e, "dropping undecodable frame");
                return;
            }
        };
        let (direction, topic) = match env.route() {
            Ok((d, t)) => (d, t.to_string()),
            Err(e) => {
                tracing::warn!(messenger = %self.name, error = %e, "dropping frame");
                return;
            }
        };

        match direction {
            Direction::Reply => self.on_reply(topic, env.id, env.payload),
            Direction::Send => self.on_send(topic, env.id, env.payload, frame.sender),
        }
    }

    fn on_reply(&self, topic: String, id: Option<CorrelationId>, payload: Value) {
        let Some(id) = id else {
            tracing::debug!(messenger = %self.name, %topic, "reply without id");
            return;
        };
        let Some((_, tx)) = self.pending.remove(&(topic.clone(), id.clone())) else {
            tracing::debug!(messenger = %self.name, %topic, %id, "reply for unknown send");
            return;
        };
        let outcome = match serde_json::from_value::<ReplyPayload>(payload) {
            Ok(body) => body.into_result(),
            Err(e) => Err(RpcError::new(
                ErrorCode::InternalError,
                format!("malformed reply: {e}"),
            )),
        };
        let _ = tx.send(outcome);
    }

    fn on_send(
        self: &Arc<Self>,
        topic: String,
        id: Option<CorrelationId>,
        payload: Value,
        sender: Option<SenderInfo>,
    ) {
        let Some(handler) = self.handlers.get(&topic).map(|h| Arc::clone(h.value())) else {
            tracing::debug!(messenger = %self.name, %topic, "no handler registered");
            return;
        };

        let me = Arc::clone(self);
        tokio::spawn(async move {
            let meta = ReplyMeta {
                topic: topic.clone(),
                id: id.clone(),
                sender,
            };
            let outcome = handler(payload, meta).await;
            let reply = MessageEnvelope::<Value>::reply(&topic, id, outcome);
            match encode_envelope(&reply) {
                Ok(bytes) => {
                    if let Err(e) = me.channel.post(Bytes::from(bytes)).await {
                        tracing::warn!(messenger = %me.name, %topic, error = %e, "reply not delivered");
                    }
                }
                Err(e) => tracing::error!(messenger = %me.name, %topic, error = %e, "reply encode failed"),
            }
        });
    }
}
