//! Portal host: answers provider requests from page contexts.

pub mod method;
pub mod plan;
pub mod recover;
pub mod router;
pub mod rpc;

use std::sync::Arc;

use walletbridge_core::host::dapp_host;
use walletbridge_core::protocol::rpc::ProviderRequest;
use walletbridge_core::{BridgeError, Result};
use walletbridge_transport::transport::provider_transport;
use walletbridge_transport::Messenger;

use crate::app_state::AppState;

pub use method::{Method, MethodKind};
pub use router::PortalRouter;

/// One connected page (a tab's top frame, or a relay standing in for it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    pub context_id: String,
    /// Normalized dapp host; sessions are keyed by it.
    pub host: String,
    pub url: String,
    pub tab_id: Option<u64>,
}

impl PageContext {
    pub fn from_url(url: &str, tab_id: Option<u64>) -> Result<Self> {
        let host = dapp_host(url)
            .ok_or_else(|| BridgeError::InvalidParams(format!("not a dapp page: {url}")))?;
        Ok(Self {
            context_id: uuid::Uuid::new_v4().to_string(),
            host,
            url: url.to_string(),
            tab_id,
        })
    }
}

/// Serve provider requests from `ctx` over `messenger` and register it for
/// pushes to its host.
pub fn attach(state: &AppState, messenger: &Arc<Messenger>, ctx: PageContext) {
    state.approvals().open_context(&ctx.context_id);
    let router = PortalRouter::new(state.clone());
    let handler_ctx = ctx.clone();
    provider_transport(Arc::clone(messenger)).reply(move |req: ProviderRequest, _meta| {
        let router = router.clone();
        let ctx = handler_ctx.clone();
        async move { Ok(router.handle(req, &ctx).await) }
    });

    state.push().attach(&ctx.context_id, &ctx.host, Arc::clone(messenger));
    state.metrics().contexts_active.inc(&[]);
    tracing::info!(context = %ctx.context_id, host = %ctx.host, tab = ?ctx.tab_id, "page context attached");
}

/// Forget `ctx`; its pending approvals settle with DISCONNECTED.
pub fn detach(state: &AppState, ctx: &PageContext) {
    let purged = state.approvals().purge_context(&ctx.context_id);
    if purged > 0 {
        state
            .metrics()
            .approvals_settled
            .add(&[("settlement", "purged")], purged as u64);
    }
    if state.push().detach(&ctx.context_id).is_some() {
        state.metrics().contexts_active.dec(&[]);
    }
    state.limiter().prune_idle();
    tracing::info!(context = %ctx.context_id, host = %ctx.host, purged, "page context detached");
}
