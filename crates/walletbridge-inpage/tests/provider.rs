//! Injected provider against a scripted background messenger.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use serde_json::{json, Value};

use walletbridge_core::protocol::rpc::{ProviderRequest, ProviderResponse, RequestArguments};
use walletbridge_core::BridgeError;
use walletbridge_inpage::{InjectedProvider, ProviderEvent};
use walletbridge_transport::channel::{memory, SenderInfo};
use walletbridge_transport::transport::provider_transport;
use walletbridge_transport::Messenger;

const HOST: &str = "app.example";

fn wired() -> (InjectedProvider, Arc<Messenger>) {
    let page_info = SenderInfo {
        url: Some("https://app.example/".into()),
        tab_id: Some(1),
        context_id: "page-1".into(),
    };
    let (left, right) = memory::pair(Some(page_info), None);
    let page = Messenger::start("page", left.channel, left.inbound);
    let bg = Messenger::start("background", right.channel, right.inbound);
    (InjectedProvider::new(page, HOST), bg)
}

/// Background that answers every request with its own id.
fn echo_ids(bg: &Arc<Messenger>) {
    provider_transport(Arc::clone(bg)).reply(|req: ProviderRequest, _| async move {
        Ok(ProviderResponse::ok(req.id, json!(req.id)))
    });
}

async fn push(bg: &Arc<Messenger>, topic: &str, payload: Value) {
    let _: Value = bg.send(topic, &payload, None).await.unwrap();
}

#[tokio::test]
async fn request_ids_start_at_zero_and_increase() {
    let (provider, bg) = wired();
    echo_ids(&bg);

    let mut seen = Vec::new();
    for _ in 0..4 {
        seen.push(provider.request(RequestArguments::new("eth_blockNumber")).await.unwrap());
    }
    assert_eq!(seen, vec![json!(0), json!(1), json!(2), json!(3)]);
}

#[tokio::test]
async fn request_accounts_caches_selected_address() {
    let (provider, bg) = wired();
    provider_transport(Arc::clone(&bg)).reply(|req: ProviderRequest, _| async move {
        assert_eq!(req.method, "eth_requestAccounts");
        Ok(ProviderResponse::ok(req.id, json!(["0xabc0000000000000000000000000000000000001"])))
    });

    assert!(!provider.is_connected());
    let out = provider.enable().await.unwrap();
    assert_eq!(out, json!(["0xabc0000000000000000000000000000000000001"]));
    assert_eq!(
        provider.selected_address().as_deref(),
        Some("0xabc0000000000000000000000000000000000001")
    );
    assert!(provider.is_connected());
}

#[tokio::test]
async fn chain_id_result_refreshes_cache() {
    let (provider, bg) = wired();
    provider_transport(Arc::clone(&bg)).reply(|req: ProviderRequest, _| async move {
        Ok(ProviderResponse::ok(req.id, json!("0x89")))
    });

    assert_eq!(provider.chain_id(), "0x1");
    assert_eq!(provider.network_version(), "1");
    provider.request(RequestArguments::new("eth_chainId")).await.unwrap();
    assert_eq!(provider.chain_id(), "0x89");
    assert_eq!(provider.network_version(), "137");
}

#[tokio::test]
async fn error_response_rejects_with_its_code() {
    let (provider, bg) = wired();
    provider_transport(Arc::clone(&bg)).reply(|req: ProviderRequest, _| async move {
        Ok(ProviderResponse::err(req.id, &BridgeError::UserRejected))
    });

    let err = provider.request(RequestArguments::new("eth_requestAccounts")).await.unwrap_err();
    assert_eq!(err.code(), 4001);
    assert!(provider.selected_address().is_none());
}

#[tokio::test]
async fn mismatched_response_id_resolves_null() {
    let (provider, bg) = wired();
    provider_transport(Arc::clone(&bg)).reply(|req: ProviderRequest, _| async move {
        Ok(ProviderResponse::ok(req.id + 1, json!("stale")))
    });

    let out = provider.request(RequestArguments::new("eth_chainId")).await.unwrap();
    assert_eq!(out, Value::Null);
    assert_eq!(provider.chain_id(), "0x1");
}

#[tokio::test]
async fn legacy_send_forms() {
    let (provider, bg) = wired();
    provider_transport(Arc::clone(&bg)).reply(|req: ProviderRequest, _| async move {
        Ok(ProviderResponse::ok(req.id, json!({ "method": req.method, "params": req.params })))
    });

    let out = provider
        .send(json!("eth_getBalance"), Some(json!(["0xabc", "latest"])))
        .await
        .unwrap();
    assert_eq!(out, json!({ "method": "eth_getBalance", "params": ["0xabc", "latest"] }));

    let out = provider
        .send_async(json!({ "jsonrpc": "2.0", "id": 9, "method": "eth_accounts" }))
        .await
        .unwrap();
    assert_eq!(
        out,
        json!({ "jsonrpc": "2.0", "id": 9, "result": { "method": "eth_accounts", "params": null } })
    );

    let err = provider.send(json!(42), None).await.unwrap_err();
    assert_eq!(err.code(), -32602);
}

#[tokio::test]
async fn pushes_update_state_and_emit_in_order() {
    let (provider, bg) = wired();
    let mut events = provider.subscribe();

    push(
        &bg,
        "connect:app.example",
        json!({ "address": "0xabc", "chainId": "0xa" }),
    )
    .await;
    push(&bg, "chainChanged:app.example", json!(137)).await;
    push(&bg, "accountsChanged:app.example", json!("0xdef")).await;
    push(&bg, "disconnect:app.example", Value::Null).await;

    assert_eq!(
        events.recv().await.unwrap(),
        ProviderEvent::Connect { chain_id: "0xa".into() }
    );
    assert_eq!(events.recv().await.unwrap(), ProviderEvent::ChainChanged("0x89".into()));
    assert_eq!(
        events.recv().await.unwrap(),
        ProviderEvent::AccountsChanged(vec!["0xdef".into()])
    );
    assert_eq!(events.recv().await.unwrap(), ProviderEvent::Disconnect);

    assert_eq!(provider.chain_id(), "0x89");
    assert_eq!(provider.network_version(), "137");
    assert!(!provider.is_connected());
    assert!(provider.selected_address().is_none());
}

#[tokio::test]
async fn malformed_chain_push_is_rejected() {
    let (provider, bg) = wired();
    let res: Result<Value, _> = bg.send("chainChanged:app.example", &json!(true), None).await;
    assert_eq!(res.unwrap_err().code(), -32602);
    assert_eq!(provider.chain_id(), "0x1");
}

#[tokio::test]
async fn announced_copy_shares_state_but_is_not_metamask() {
    use walletbridge_inpage::Eip1193Provider;

    let (provider, bg) = wired();
    echo_ids(&bg);
    let copy = provider.announced_copy();

    assert!(Eip1193Provider::is_metamask(&provider));
    assert!(!Eip1193Provider::is_metamask(&copy));

    push(&bg, "chainChanged:app.example", json!("0x2105")).await;
    assert_eq!(copy.chain_id(), "0x2105");

    // one id counter across both handles
    assert_eq!(provider.request(RequestArguments::new("eth_chainId")).await.unwrap(), json!(0));
    assert_eq!(copy.request(RequestArguments::new("eth_chainId")).await.unwrap(), json!(1));
}
