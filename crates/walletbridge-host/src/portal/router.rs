//! Method router: plans a request, then executes the plan.
//!
//! Every failure becomes a `ProviderResponse.error`; nothing escapes across
//! the channel as a transport error.

use std::str::FromStr;
use std::time::Instant;

use alloy::primitives::Address;
use serde_json::{json, Value};

use walletbridge_core::chain::chain_id_from_value;
use walletbridge_core::protocol::rpc::{ProviderRequest, ProviderResponse};
use walletbridge_core::{BridgeError, Result};

use crate::app_state::AppState;
use crate::approval::NewApproval;
use crate::policy::PolicyDecision;
use crate::portal::method::Method;
use crate::portal::plan::{plan, truthy, Mutation, OnGrant, Outcome};
use crate::portal::PageContext;

#[derive(Clone)]
pub struct PortalRouter {
    state: AppState,
}

impl PortalRouter {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub async fn handle(&self, req: ProviderRequest, ctx: &PageContext) -> ProviderResponse {
        let started = Instant::now();
        let method = Method::parse(&req.method);
        let kind = method.kind().as_str();

        let res = self.route(&method, &req, ctx).await;

        let outcome = match &res {
            Ok(_) => "ok",
            Err(e) => e.error_code().map(|c| c.as_str()).unwrap_or("RPC_ERROR"),
        };
        let metrics = self.state.metrics();
        metrics.requests.inc(&[("kind", kind), ("outcome", outcome)]);
        metrics.route_duration.observe(&[("kind", kind)], started.elapsed());

        match &res {
            Ok(_) => tracing::debug!(id = req.id, method = %req.method, host = %ctx.host, "request answered"),
            Err(e) => tracing::debug!(id = req.id, method = %req.method, host = %ctx.host, code = e.code(), error = %e, "request failed"),
        }
        ProviderResponse::from_result(req.id, res)
    }

    async fn route(&self, method: &Method, req: &ProviderRequest, ctx: &PageContext) -> Result<Value> {
        if !method.is_rate_limit_exempt() {
            if let PolicyDecision::Reject { msg, .. } = self.state.limiter().check(&ctx.host) {
                self.state.metrics().rate_limited.inc(&[]);
                tracing::warn!(host = %ctx.host, method = %req.method, reason = msg, "rate limited");
                return Err(BridgeError::RateLimited);
            }
        }

        let session = self.state.sessions().get(&ctx.host);
        let outcome = plan(method, req.params.as_deref(), session.as_ref(), self.state.chains())?;

        match outcome {
            Outcome::Immediate(v) => Ok(v),
            Outcome::Passthrough { chain_id } => {
                let rpc_url = self
                    .state
                    .chains()
                    .rpc_url(chain_id)
                    .ok_or(BridgeError::ChainNotSupported(chain_id))?;
                self.state
                    .rpc()
                    .request(chain_id, &rpc_url, method.as_str(), req.params.clone())
                    .await
            }
            Outcome::Mutate(m) => self.apply(m, ctx),
            Outcome::Approval(p) => {
                let ticket = self.state.approvals().enqueue(NewApproval {
                    request_id: req.id,
                    method: req.method.clone(),
                    params: req.params.clone(),
                    host: ctx.host.clone(),
                    tab_id: ctx.tab_id,
                    context_id: ctx.context_id.clone(),
                });
                let granted = ticket.wait().await?;
                if !truthy(&granted) {
                    tracing::info!(host = %ctx.host, method = %req.method, "approval granted with a falsy result; treating as rejection");
                    return Err(BridgeError::UserRejected);
                }
                self.on_grant(p.on_grant, granted, ctx)
            }
        }
    }

    fn apply(&self, m: Mutation, ctx: &PageContext) -> Result<Value> {
        match m {
            Mutation::SwitchChain { chain_id } => {
                self.state.session_control().switch_chain(&ctx.host, chain_id)?;
            }
            Mutation::RegisterRpc { chain_id, rpc_url } => {
                if let Some(url) = rpc_url {
                    self.state.chains().add_rpc(chain_id, &url);
                }
            }
            Mutation::RevokeSession => {
                self.state.session_control().remove_session(&ctx.host);
            }
        }
        Ok(Value::Null)
    }

    fn on_grant(&self, on_grant: OnGrant, granted: Value, ctx: &PageContext) -> Result<Value> {
        match on_grant {
            OnGrant::CreateSession => {
                let address = granted
                    .get("address")
                    .and_then(Value::as_str)
                    .ok_or_else(|| BridgeError::Internal("approval result lacks address".into()))
                    .and_then(|a| {
                        Address::from_str(a)
                            .map_err(|e| BridgeError::Internal(format!("approved address invalid: {e}")))
                    })?;

                let chains = self.state.chains();
                let chain_id = match granted.get("chainId").map(chain_id_from_value) {
                    Some(Ok(id)) if chains.is_supported(id) => id,
                    other => {
                        tracing::warn!(host = %ctx.host, granted = ?other, "approved chain unusable; using default");
                        chains.default_chain_id()
                    }
                };

                let session = self
                    .state
                    .session_control()
                    .add_session(&ctx.host, address, chain_id)?;
                Ok(json!([session.address_lower()]))
            }
            OnGrant::AddChain(entry) => {
                self.state.chains().add_chain(entry);
                Ok(Value::Null)
            }
            OnGrant::CoerceBool => Ok(Value::Bool(truthy(&granted))),
            OnGrant::Forward => Ok(granted),
        }
    }
}
