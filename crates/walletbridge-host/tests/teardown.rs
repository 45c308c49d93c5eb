//! Page context teardown: approvals, push workers and limiter state.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;
use bytes::Bytes;
use serde_json::json;

use walletbridge_core::protocol::envelope::{decode_envelope, encode_envelope, CorrelationId, MessageEnvelope};
use walletbridge_core::protocol::rpc::{ProviderRequest, ProviderResponse};
use walletbridge_host::app_state::AppState;
use walletbridge_host::config;
use walletbridge_host::portal::{self, PageContext};
use walletbridge_transport::channel::memory;
use walletbridge_transport::{Channel, Messenger, PROVIDER_REQUEST_TOPIC};

const CONFIG: &str = r#"
version: 1
chains:
  - { chain_id: 1, rpc_url: "https://rpc.one.example" }
push: { ack_timeout_ms: 150 }
"#;

const ADDR: &str = "0x00000000000000000000000000000000000000aa";

fn state() -> AppState {
    AppState::new(config::load_from_str(CONFIG).unwrap()).unwrap()
}

fn sign_frame(id: u64) -> Bytes {
    let req = ProviderRequest {
        id,
        method: "personal_sign".into(),
        params: Some(vec![json!("0x68656c6c6f"), json!(ADDR)]),
    };
    let env = MessageEnvelope::send(PROVIDER_REQUEST_TOPIC, Some(CorrelationId::Num(id)), &req);
    Bytes::from(encode_envelope(&env).unwrap())
}

#[tokio::test]
async fn request_buffered_at_teardown_is_refused_not_queued() {
    let state = state();
    let ctx = PageContext::from_url("https://app.example/", Some(1)).unwrap();
    let (page_end, host_end) = memory::pair(None, None);
    let host_side = Messenger::start("host", host_end.channel, host_end.inbound);
    portal::attach(&state, &host_side, ctx.clone());
    let mut page_inbound = page_end.inbound;

    // Still sitting in the host's inbound buffer when the context goes away.
    page_end.channel.post(sign_frame(0)).await.unwrap();
    portal::detach(&state, &ctx);

    let frame = tokio::time::timeout(Duration::from_secs(2), page_inbound.recv())
        .await
        .expect("buffered request answered")
        .expect("channel open");
    let env = decode_envelope(&frame.bytes).unwrap();
    let resp: ProviderResponse = serde_json::from_value(env.payload["response"].clone()).unwrap();
    assert_eq!(resp.id, 0);
    assert_eq!(resp.error.expect("refused").code, 4900);

    assert!(state.approvals().is_empty());
    assert!(!state.approvals().is_context_open(&ctx.context_id));
}

#[tokio::test]
async fn detach_purges_pending_approvals() {
    let state = state();
    let ctx = PageContext::from_url("https://app.example/", Some(1)).unwrap();
    let (page_end, host_end) = memory::pair(None, None);
    let host_side = Messenger::start("host", host_end.channel, host_end.inbound);
    portal::attach(&state, &host_side, ctx.clone());
    let mut page_inbound = page_end.inbound;

    page_end.channel.post(sign_frame(4)).await.unwrap();
    for _ in 0..200 {
        if !state.approvals().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(state.approvals().len(), 1);

    portal::detach(&state, &ctx);
    assert!(state.approvals().is_empty());

    let frame = tokio::time::timeout(Duration::from_secs(2), page_inbound.recv())
        .await
        .unwrap()
        .unwrap();
    let env = decode_envelope(&frame.bytes).unwrap();
    let resp: ProviderResponse = serde_json::from_value(env.payload["response"].clone()).unwrap();
    assert_eq!(resp.id, 4);
    assert_eq!(resp.error.unwrap().code, 4900);
}

#[tokio::test]
async fn last_detach_releases_the_host_push_worker() {
    let state = state();
    let a = PageContext::from_url("https://app.example/a", None).unwrap();
    let b = PageContext::from_url("https://app.example/b", None).unwrap();
    for ctx in [&a, &b] {
        let (_page_end, host_end) = memory::pair(None, None);
        let host_side = Messenger::start("host", host_end.channel, host_end.inbound);
        portal::attach(&state, &host_side, ctx.clone());
    }

    state
        .session_control()
        .add_session(&a.host, Address::from_str(ADDR).unwrap(), 1)
        .unwrap();
    assert_eq!(state.push().worker_count(), 1);

    portal::detach(&state, &a);
    assert_eq!(state.push().worker_count(), 1, "b still attached");
    portal::detach(&state, &b);
    assert_eq!(state.push().worker_count(), 0);
    assert_eq!(state.push().context_count(), 0);
}
