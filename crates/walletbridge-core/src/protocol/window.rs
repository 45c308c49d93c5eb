//! Page <-> content-script messages (`window.postMessage(msg, "*")`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::rpc::{ProviderResponse, RequestArguments};

/// Wire shape exchanged over `window.postMessage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WindowMessage {
    #[serde(rename = "TO_PROVIDER")]
    ToProvider { id: u64, payload: RequestArguments },
    #[serde(rename = "FROM_PROVIDER")]
    FromProvider { id: u64, payload: ProviderResponse },
}

impl WindowMessage {
    pub fn id(&self) -> u64 {
        match self {
            WindowMessage::ToProvider { id, .. } | WindowMessage::FromProvider { id, .. } => *id,
        }
    }
}

/// A `message` event as observed by a listener on the page's window.
#[derive(Debug, Clone)]
pub struct WindowEvent {
    /// `event.source === window`.
    pub from_own_window: bool,
    pub data: Value,
}

impl WindowEvent {
    /// Accept only same-window events carrying a well-formed message.
    /// Everything else on the page's message bus is ignored.
    pub fn accept(&self) -> Option<WindowMessage> {
        if !self.from_own_window {
            return None;
        }
        serde_json::from_value(self.data.clone()).ok()
    }
}
