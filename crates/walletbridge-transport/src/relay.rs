//! Content-script relay.
//!
//! Pages without a direct messenger talk to the wallet through
//! `window.postMessage`. The relay accepts `TO_PROVIDER` messages that
//! originate from the page's own window, forwards them over the provider
//! transport and posts the response back as `FROM_PROVIDER` with the same id.

use tokio::sync::mpsc;

use walletbridge_core::protocol::envelope::CorrelationId;
use walletbridge_core::protocol::rpc::{ProviderRequest, ProviderResponse};
use walletbridge_core::protocol::window::{WindowEvent, WindowMessage};
use walletbridge_core::BridgeError;

use crate::transport::ProviderTransport;

#[derive(Clone)]
pub struct WindowRelay {
    transport: ProviderTransport,
    outbound: mpsc::UnboundedSender<WindowMessage>,
}

impl WindowRelay {
    /// `outbound` stands in for `window.postMessage(msg, "*")`.
    pub fn new(transport: ProviderTransport, outbound: mpsc::UnboundedSender<WindowMessage>) -> Self {
        Self { transport, outbound }
    }

    /// Returns whether the event was taken. Forwarding runs in the background
    /// so slow requests (approvals) never hold up later ones.
    pub fn handle_event(&self, event: &WindowEvent) -> bool {
        let Some(WindowMessage::ToProvider { id, payload }) = event.accept() else {
            return false;
        };
        let req = ProviderRequest {
            id,
            method: payload.method,
            params: payload.params,
        };
        let relay = self.clone();
        tokio::spawn(async move { relay.forward(req).await });
        true
    }

    async fn forward(&self, req: ProviderRequest) {
        let id = req.id;
        tracing::debug!(id, method = %req.method, "relaying provider request");
        let resp = match self.transport.send(&req, Some(CorrelationId::Num(id))).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!(id, error = %e, "provider request failed in transit");
                ProviderResponse::err(id, &BridgeError::Internal(e.to_string()))
            }
        };
        if self
            .outbound
            .send(WindowMessage::FromProvider { id, payload: resp })
            .is_err()
        {
            tracing::debug!(id, "page window gone; response dropped");
        }
    }

    /// Drain a window event stream until it closes.
    pub async fn run(self, mut events: mpsc::Receiver<WindowEvent>) {
        while let Some(ev) = events.recv().await {
            self.handle_event(&ev);
        }
    }
}
