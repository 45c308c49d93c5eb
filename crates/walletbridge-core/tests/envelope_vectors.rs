//! Messenger envelope vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::fs;

use serde_json::{json, Value};

use walletbridge_core::protocol::envelope::{
    decode_envelope, encode_envelope, CorrelationId, Direction, MessageEnvelope, ReplyPayload,
};
use walletbridge_core::protocol::rpc::{ProviderRequest, ProviderResponse};

fn load(name: &str) -> Vec<u8> {
    fs::read(format!("tests/vectors/{name}")).unwrap()
}

#[test]
fn send_envelope_carries_provider_request() {
    let env = decode_envelope(&load("envelope_send.json")).unwrap();
    let (dir, topic) = env.route().unwrap();
    assert_eq!(dir, Direction::Send);
    assert_eq!(topic, "providerRequest");
    assert_eq!(env.id, Some(CorrelationId::Num(5)));

    let req: ProviderRequest = serde_json::from_value(env.payload).unwrap();
    assert_eq!(req.id, 5);
    assert_eq!(req.method, "eth_blockNumber");
}

#[test]
fn reply_envelope_ok() {
    let env = decode_envelope(&load("envelope_reply_ok.json")).unwrap();
    assert_eq!(env.route().unwrap(), (Direction::Reply, "providerRequest"));
    let body: ReplyPayload = serde_json::from_value(env.payload).unwrap();
    let resp: ProviderResponse = serde_json::from_value(body.into_result().unwrap()).unwrap();
    assert_eq!(resp.id, 5);
    assert_eq!(resp.result, Some(json!("0x10d4f")));
    assert!(resp.error.is_none());
}

#[test]
fn reply_envelope_error_with_string_id() {
    let env = decode_envelope(&load("envelope_reply_error.json")).unwrap();
    assert_eq!(env.id, Some(CorrelationId::Str("popup:3".into())));
    let body: ReplyPayload = serde_json::from_value(env.payload).unwrap();
    let err = body.into_result().expect_err("error reply");
    assert_eq!(err.code, 4001);
}

#[test]
fn topic_without_marker_is_rejected() {
    let env = decode_envelope(&load("envelope_no_marker.json")).unwrap();
    let err = env.route().expect_err("must fail");
    assert_eq!(err.code(), -32602);
}

#[test]
fn garbage_is_an_error_not_a_panic() {
    assert!(decode_envelope(b"\x00\x01not json").is_err());
    assert!(decode_envelope(br#"{"topic":"> a","payload":1,"extra":true}"#).is_err());
}

#[test]
fn encoded_reply_decodes_to_same_topic_and_id() {
    let reply = MessageEnvelope::<Value>::reply(
        "chainChanged:app.example",
        Some(CorrelationId::Num(9)),
        Ok(json!(null)),
    );
    let bytes = encode_envelope(&reply).unwrap();
    let back = decode_envelope(&bytes).unwrap();
    assert_eq!(back.route().unwrap(), (Direction::Reply, "chainChanged:app.example"));
    assert_eq!(back.id, Some(CorrelationId::Num(9)));
}
