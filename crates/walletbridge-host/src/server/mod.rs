//! Axum router wiring.
//!
//! - `/v1/portal`    : WebSocket for one page context
//! - `/v1/approvals` : popup-side approval resolution
//! - `/v1/sessions`  : connected hosts
//! - `/healthz`, `/metrics`

pub mod admin;
pub mod ops;
pub mod ws;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::app_state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/portal", get(ws::ws_upgrade))
        .route("/v1/approvals", get(admin::list_approvals))
        .route("/v1/approvals/:id/approve", post(admin::approve))
        .route("/v1/approvals/:id/reject", post(admin::reject))
        .route(
            "/v1/sessions",
            get(admin::list_sessions).delete(admin::disconnect_all),
        )
        .route("/v1/sessions/:host", delete(admin::remove_session))
        .route("/healthz", get(ops::healthz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
