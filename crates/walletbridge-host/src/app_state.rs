//! Shared application state for the portal host.

use std::sync::Arc;
use std::time::Duration;

use walletbridge_core::Result;

use crate::approval::ApprovalQueue;
use crate::config::HostConfig;
use crate::obs::metrics::HostMetrics;
use crate::policy::HostRateLimiter;
use crate::portal::rpc::{HttpRpcClient, RpcClient};
use crate::push::PushHub;
use crate::registry::{ChainRegistry, SessionRegistry};
use crate::sessions::SessionControl;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: HostConfig,
    sessions: SessionRegistry,
    chains: ChainRegistry,
    approvals: ApprovalQueue,
    push: PushHub,
    limiter: HostRateLimiter,
    metrics: Arc<HostMetrics>,
    rpc: Arc<dyn RpcClient>,
}

impl AppState {
    /// Build state with the HTTP passthrough client.
    /// Returns Result so main can report startup errors.
    pub fn new(cfg: HostConfig) -> Result<Self> {
        let rpc = HttpRpcClient::new(Duration::from_millis(cfg.rpc.timeout_ms))?;
        Ok(Self::with_rpc(cfg, Arc::new(rpc)))
    }

    /// Build state around any passthrough client.
    pub fn with_rpc(cfg: HostConfig, rpc: Arc<dyn RpcClient>) -> Self {
        let metrics = Arc::new(HostMetrics::default());
        let chains = ChainRegistry::from_config(&cfg.chains, cfg.default_chain_id);
        let push = PushHub::new(
            Duration::from_millis(cfg.push.ack_timeout_ms),
            Arc::clone(&metrics),
        );
        let limiter = HostRateLimiter::new(&cfg.rate_limit);

        tracing::info!(
            chains = ?chains.supported_chain_ids(),
            default_chain_id = cfg.default_chain_id,
            "portal host state ready"
        );

        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                sessions: SessionRegistry::new(),
                chains,
                approvals: ApprovalQueue::new(),
                push,
                limiter,
                metrics,
                rpc,
            }),
        }
    }

    pub fn cfg(&self) -> &HostConfig {
        &self.inner.cfg
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }

    pub fn chains(&self) -> &ChainRegistry {
        &self.inner.chains
    }

    pub fn approvals(&self) -> &ApprovalQueue {
        &self.inner.approvals
    }

    pub fn push(&self) -> &PushHub {
        &self.inner.push
    }

    pub fn limiter(&self) -> &HostRateLimiter {
        &self.inner.limiter
    }

    pub fn metrics(&self) -> &HostMetrics {
        &self.inner.metrics
    }

    pub fn rpc(&self) -> Arc<dyn RpcClient> {
        Arc::clone(&self.inner.rpc)
    }

    pub fn session_control(&self) -> SessionControl {
        SessionControl::new(self.clone())
    }

    /// Point-in-time gauges appended to `/metrics`.
    pub fn metrics_extra(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("walletbridge_approvals_pending", self.approvals().len() as u64),
            ("walletbridge_sessions", self.sessions().len() as u64),
            ("walletbridge_page_contexts", self.push().context_count() as u64),
        ]
    }
}
