//! Wallet-side HTTP surface: resolve approvals, inspect and drop sessions.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::app_state::AppState;
use crate::approval::{ApprovalError, Settlement};

fn not_found(e: ApprovalError) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": e.to_string() }))).into_response()
}

pub async fn list_approvals(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.approvals().list())
}

/// Body is the approved result (`{address, chainId}`, a signature, ...).
/// A missing body approves with `true`. A falsy body (`null`, `false`, `0`,
/// `""`) reads as a rejection to the requesting page.
pub async fn approve(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    body: Option<Json<Value>>,
) -> Response {
    let value = body.map(|Json(v)| v).unwrap_or(Value::Bool(true));
    match state.approvals().resolve(id, value) {
        Ok(()) => {
            state
                .metrics()
                .approvals_settled
                .inc(&[("settlement", Settlement::Approved.as_str())]);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => not_found(e),
    }
}

pub async fn reject(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    match state.approvals().reject(id) {
        Ok(()) => {
            state
                .metrics()
                .approvals_settled
                .inc(&[("settlement", Settlement::Rejected.as_str())]);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => not_found(e),
    }
}

pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let sessions: Vec<Value> = state.sessions().list().iter().map(|s| s.to_json()).collect();
    Json(sessions)
}

pub async fn remove_session(State(state): State<AppState>, Path(host): Path<String>) -> StatusCode {
    if state.session_control().remove_session(&host) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn disconnect_all(State(state): State<AppState>) -> impl IntoResponse {
    let n = state.session_control().disconnect_all();
    Json(json!({ "disconnected": n }))
}
