//! Session changes initiated from the wallet side (popup procedures, HTTP
//! admin routes, and the router's own mutations). Every change is pushed to
//! the affected host's pages.

use alloy::primitives::Address;

use walletbridge_core::host::normalize_host;
use walletbridge_core::protocol::push::PushEvent;
use walletbridge_core::{BridgeError, Result};

use crate::app_state::AppState;
use crate::registry::Session;

#[derive(Clone)]
pub struct SessionControl {
    state: AppState,
}

impl SessionControl {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    fn ensure_supported(&self, chain_id: u64) -> Result<()> {
        if self.state.chains().is_supported(chain_id) {
            Ok(())
        } else {
            Err(BridgeError::ChainNotSupported(chain_id))
        }
    }

    /// Connect (or reconnect) `host`.
    pub fn add_session(&self, host: &str, address: Address, chain_id: u64) -> Result<Session> {
        self.ensure_supported(chain_id)?;
        let session = Session::new(host, address, chain_id);
        let existed = self.state.sessions().set(session.clone()).is_some();

        tracing::info!(host = %session.host, chain_id, new = !existed, "session stored");
        let push = self.state.push();
        push.push(
            &session.host,
            PushEvent::AccountsChanged {
                address: session.address_lower(),
            },
        );
        if !existed {
            push.push(
                &session.host,
                PushEvent::Connect {
                    address: session.address_lower(),
                    chain_id,
                },
            );
        }
        Ok(session)
    }

    pub fn switch_account(&self, host: &str, address: Address, chain_id: u64) -> Result<Session> {
        self.ensure_supported(chain_id)?;
        let host = normalize_host(host);
        self.state
            .sessions()
            .update_address(&host, address)
            .ok_or_else(|| BridgeError::Unauthorized(format!("no session for {host}")))?;
        let session = self
            .state
            .sessions()
            .update_chain(&host, chain_id)
            .ok_or_else(|| BridgeError::Unauthorized(format!("no session for {host}")))?;

        tracing::info!(%host, chain_id, "session account switched");
        self.state.push().push(
            &host,
            PushEvent::AccountsChanged {
                address: session.address_lower(),
            },
        );
        self.state.push().push(&host, PushEvent::ChainChanged { chain_id });
        Ok(session)
    }

    pub fn switch_chain(&self, host: &str, chain_id: u64) -> Result<Session> {
        self.ensure_supported(chain_id)?;
        let host = normalize_host(host);
        let session = self
            .state
            .sessions()
            .update_chain(&host, chain_id)
            .ok_or_else(|| BridgeError::Unauthorized(format!("no session for {host}")))?;

        tracing::info!(%host, chain_id, "session chain switched");
        self.state.push().push(&host, PushEvent::ChainChanged { chain_id });
        Ok(session)
    }

    /// Returns whether a session existed.
    pub fn remove_session(&self, host: &str) -> bool {
        let Some(session) = self.state.sessions().remove(host) else {
            return false;
        };
        tracing::info!(host = %session.host, "session removed");
        self.state.limiter().reset(&session.host);
        self.state.push().push(&session.host, PushEvent::Disconnect);
        true
    }

    /// Returns how many sessions were removed.
    pub fn disconnect_all(&self) -> usize {
        let removed = self.state.sessions().clear();
        for s in &removed {
            self.state.limiter().reset(&s.host);
            self.state.push().push(&s.host, PushEvent::Disconnect);
        }
        tracing::info!(count = removed.len(), "all sessions disconnected");
        removed.len()
    }
}
