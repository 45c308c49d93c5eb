//! Messenger envelope.
//!
//! A send travels as `"> {topic}"`, its reply as `"< {topic}"` with the same
//! correlation id. Reply payloads are `{"response": ..}` or `{"error": ..}`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BridgeError, Result, RpcError};

const SEND_MARKER: &str = "> ";
const REPLY_MARKER: &str = "< ";

/// Correlation id: numeric for provider requests, string for internal sends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrelationId {
    Num(u64),
    Str(String),
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationId::Num(n) => write!(f, "{n}"),
            CorrelationId::Str(s) => f.write_str(s),
        }
    }
}

impl From<u64> for CorrelationId {
    fn from(n: u64) -> Self {
        CorrelationId::Num(n)
    }
}

impl From<String> for CorrelationId {
    fn from(s: String) -> Self {
        CorrelationId::Str(s)
    }
}

/// Which half of a round-trip a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Send,
    Reply,
}

/// Envelope as it crosses a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageEnvelope<T = Value> {
    /// Direction-marked topic (`"> providerRequest"`).
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CorrelationId>,
    pub payload: T,
}

impl<T> MessageEnvelope<T> {
    pub fn send(topic: &str, id: Option<CorrelationId>, payload: T) -> Self {
        Self {
            topic: format!("{SEND_MARKER}{topic}"),
            id,
            payload,
        }
    }

    /// Split the marked topic into direction and bare topic.
    pub fn route(&self) -> Result<(Direction, &str)> {
        split_topic(&self.topic)
    }
}

impl MessageEnvelope<Value> {
    /// Build the reply envelope for a handler outcome.
    pub fn reply(
        topic: &str,
        id: Option<CorrelationId>,
        outcome: std::result::Result<Value, RpcError>,
    ) -> Self {
        let payload = match outcome {
            Ok(response) => ReplyPayload {
                response: Some(response),
                error: None,
            },
            Err(error) => ReplyPayload {
                response: None,
                error: Some(error),
            },
        };
        Self {
            topic: format!("{REPLY_MARKER}{topic}"),
            id,
            // ReplyPayload only holds JSON values; serialization cannot fail.
            payload: serde_json::to_value(payload).unwrap_or(Value::Null),
        }
    }
}

/// Body of a reply frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReplyPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl ReplyPayload {
    /// Error wins over response; a reply with neither resolves to `null`.
    pub fn into_result(self) -> std::result::Result<Value, RpcError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.response.unwrap_or(Value::Null)),
        }
    }
}

/// `"> a"` -> `(Send, "a")`, `"< a"` -> `(Reply, "a")`.
pub fn split_topic(marked: &str) -> Result<(Direction, &str)> {
    if let Some(t) = marked.strip_prefix(SEND_MARKER) {
        return Ok((Direction::Send, t));
    }
    if let Some(t) = marked.strip_prefix(REPLY_MARKER) {
        return Ok((Direction::Reply, t));
    }
    Err(BridgeError::InvalidParams(format!(
        "topic without direction marker: {marked}"
    )))
}

/// Decode one frame (panic-free).
pub fn decode_envelope(bytes: &[u8]) -> Result<MessageEnvelope<Value>> {
    serde_json::from_slice(bytes)
        .map_err(|e| BridgeError::InvalidParams(format!("invalid envelope json: {e}")))
}

/// Encode one frame.
pub fn encode_envelope<T: Serialize>(env: &MessageEnvelope<T>) -> Result<Vec<u8>> {
    serde_json::to_vec(env).map_err(|e| BridgeError::Internal(format!("envelope encode failed: {e}")))
}
