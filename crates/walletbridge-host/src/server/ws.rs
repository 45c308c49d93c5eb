//! WebSocket carrier for one page context.
//!
//! Each text/binary message is one messenger frame. Lifecycle follows the
//! usual ping + idle timeout; socket close is context teardown, which purges
//! the context's pending approvals.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

use walletbridge_core::{BridgeError, Result};
use walletbridge_transport::{Channel, Frame, Messenger, SenderInfo};

use crate::app_state::AppState;
use crate::portal::{self, PageContext};

const QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Deserialize)]
pub struct PortalQuery {
    /// Page URL of the connecting context.
    pub origin: String,
    pub tab: Option<u64>,
}

/// Outbound half: frames queued for the socket writer.
struct WsChannel {
    name: String,
    out: mpsc::Sender<Message>,
}

#[async_trait]
impl Channel for WsChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_open(&self) -> bool {
        !self.out.is_closed()
    }

    async fn post(&self, bytes: Bytes) -> Result<()> {
        let text = String::from_utf8(bytes.to_vec())
            .map_err(|e| BridgeError::Internal(format!("frame not utf-8: {e}")))?;
        self.out
            .send(Message::Text(text))
            .await
            .map_err(|_| BridgeError::Disconnected(format!("{}: socket closed", self.name)))
    }
}

pub async fn ws_upgrade(
    State(app): State<AppState>,
    ws: WebSocketUpgrade,
    Query(q): Query<PortalQuery>,
) -> Response {
    let ctx = match PageContext::from_url(&q.origin, q.tab) {
        Ok(ctx) => ctx,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = run_context(app, ctx, socket).await {
            tracing::warn!(error = %e, "page context ended with error");
        }
    })
}

async fn run_context(app: AppState, ctx: PageContext, socket: WebSocket) -> Result<()> {
    let (out_tx, mut out_rx) = mpsc::channel::<Message>(QUEUE_CAPACITY);
    let (in_tx, in_rx) = mpsc::channel::<Frame>(QUEUE_CAPACITY);

    let name = format!("portal:{}", ctx.context_id);
    let channel = Arc::new(WsChannel {
        name: name.clone(),
        out: out_tx.clone(),
    });
    let messenger = Messenger::start(name, channel, in_rx);
    portal::attach(&app, &messenger, ctx.clone());

    let sender = SenderInfo {
        url: Some(ctx.url.clone()),
        tab_id: ctx.tab_id,
        context_id: ctx.context_id.clone(),
    };

    let (mut ws_tx, mut ws_rx) = socket.split();

    let srv = &app.cfg().server;
    let ping_every = Duration::from_millis(srv.ping_interval_ms);
    let idle_timeout = Duration::from_millis(srv.idle_timeout_ms);

    let mut ping_tick = tokio::time::interval(ping_every);
    ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            maybe_out = out_rx.recv() => {
                match maybe_out {
                    Some(m) => {
                        if ws_tx.send(m).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            incoming = ws_rx.next() => {
                let Some(Ok(msg)) = incoming else { break; };
                last_activity = Instant::now();

                let bytes = match msg {
                    Message::Text(s) => Bytes::from(s.into_bytes()),
                    Message::Binary(b) => Bytes::from(b),
                    Message::Ping(payload) => {
                        let _ = out_tx.send(Message::Pong(payload)).await;
                        continue;
                    }
                    Message::Pong(_) => continue,
                    Message::Close(_) => break,
                };
                let frame = Frame { bytes, sender: Some(sender.clone()) };
                if in_tx.send(frame).await.is_err() {
                    break;
                }
            }

            _ = ping_tick.tick() => {
                let _ = out_tx.send(Message::Ping(Vec::new())).await;
            }

            _ = tokio::time::sleep(Duration::from_millis(250)) => {
                if last_activity.elapsed() >= idle_timeout {
                    tracing::info!(context = %ctx.context_id, "idle timeout");
                    break;
                }
            }
        }
    }

    // Closing the inbound queue fails the messenger's pending sends.
    drop(in_tx);
    portal::detach(&app, &ctx);
    Ok(())
}
