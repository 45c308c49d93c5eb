//! Portal router behavior against real registries and a recording RPC client.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{hex, Address};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use async_trait::async_trait;
use serde_json::{json, Value};

use walletbridge_core::protocol::rpc::{ProviderRequest, ProviderResponse};
use walletbridge_core::{BridgeError, Result};
use walletbridge_host::app_state::AppState;
use walletbridge_host::config;
use walletbridge_host::portal::rpc::RpcClient;
use walletbridge_host::portal::{self, PageContext, PortalRouter};
use walletbridge_host::registry::Session;

const CONFIG: &str = r#"
version: 1
chains:
  - { chain_id: 1, rpc_url: "https://rpc.one.example" }
  - { chain_id: 137, rpc_url: "https://rpc.polygon.example" }
  - { chain_id: 56, rpc_url: "https://rpc.bsc.example", supported: false }
rate_limit: { per_second: 3, per_minute: 5 }
push: { ack_timeout_ms: 200 }
"#;

const MIXED_CASE: &str = "0xAbCdEf0123456789aBcDeF0123456789AbCdEf01";

#[derive(Default)]
struct RecordingRpc {
    calls: Mutex<Vec<(u64, String, String)>>,
}

#[async_trait]
impl RpcClient for RecordingRpc {
    async fn request(
        &self,
        chain_id: u64,
        rpc_url: &str,
        method: &str,
        _params: Option<Vec<Value>>,
    ) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((chain_id, rpc_url.to_string(), method.to_string()));
        if method == "eth_call" {
            return Err(BridgeError::Rpc {
                code: -32000,
                message: "execution reverted".into(),
            });
        }
        Ok(json!(format!("{method}@{chain_id}")))
    }
}

struct Fixture {
    state: AppState,
    router: PortalRouter,
    ctx: PageContext,
    rpc: Arc<RecordingRpc>,
}

fn fixture() -> Fixture {
    let cfg = config::load_from_str(CONFIG).unwrap();
    let rpc = Arc::new(RecordingRpc::default());
    let state = AppState::with_rpc(cfg, rpc.clone());
    let router = PortalRouter::new(state.clone());
    let ctx = PageContext::from_url("https://www.app.example/swap", Some(7)).unwrap();
    state.approvals().open_context(&ctx.context_id);
    Fixture { state, router, ctx, rpc }
}

fn req(id: u64, method: &str, params: Value) -> ProviderRequest {
    serde_json::from_value(json!({ "id": id, "method": method, "params": params })).unwrap()
}

fn connect(f: &Fixture, chain_id: u64) {
    f.state
        .sessions()
        .set(Session::new(&f.ctx.host, Address::from_str(MIXED_CASE).unwrap(), chain_id));
}

fn result(resp: ProviderResponse) -> Value {
    assert!(resp.error.is_none(), "unexpected error: {:?}", resp.error);
    resp.result.unwrap_or(Value::Null)
}

fn error_code(resp: ProviderResponse) -> i64 {
    resp.error.expect("expected an error").code
}

async fn wait_for_approval(state: &AppState) -> u64 {
    for _ in 0..200 {
        if let Some(p) = state.approvals().list().first() {
            return p.id;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("no approval enqueued");
}

#[tokio::test]
async fn reads_without_session() {
    let f = fixture();
    assert_eq!(result(f.router.handle(req(0, "eth_accounts", json!([])), &f.ctx).await), json!([]));
    assert_eq!(result(f.router.handle(req(1, "eth_chainId", json!([])), &f.ctx).await), json!("0x1"));
    assert_eq!(result(f.router.handle(req(2, "eth_coinbase", json!([])), &f.ctx).await), Value::Null);
    assert!(f.state.approvals().is_empty());
}

#[tokio::test]
async fn request_accounts_approval_creates_lowercase_session() {
    let f = fixture();
    let router = f.router.clone();
    let ctx = f.ctx.clone();
    let pending = tokio::spawn(async move { router.handle(req(0, "eth_requestAccounts", json!([])), &ctx).await });

    let id = wait_for_approval(&f.state).await;
    assert_eq!(id, 100);
    let listed = f.state.approvals().list();
    assert_eq!(listed[0].host, "app.example");
    assert_eq!(listed[0].tab_id, Some(7));

    f.state
        .approvals()
        .resolve(id, json!({ "address": MIXED_CASE, "chainId": 1 }))
        .unwrap();

    let lower = MIXED_CASE.to_lowercase();
    let resp = pending.await.unwrap();
    assert_eq!(resp.id, 0);
    assert_eq!(result(resp), json!([lower]));

    let session = f.state.sessions().get("app.example").unwrap();
    assert_eq!(session.chain_id, 1);
    assert_eq!(session.address_lower(), lower);

    // Later reads and repeated connects are answered without approval.
    assert_eq!(result(f.router.handle(req(1, "eth_accounts", json!([])), &f.ctx).await), json!([lower]));
    assert_eq!(
        result(f.router.handle(req(2, "eth_requestAccounts", json!([])), &f.ctx).await),
        json!([lower])
    );
    assert!(f.state.approvals().is_empty());
    assert!(f.state.approvals().resolve(id, Value::Null).is_err(), "settles once");
}

#[tokio::test]
async fn approved_unsupported_chain_falls_back_to_default() {
    let f = fixture();
    let router = f.router.clone();
    let ctx = f.ctx.clone();
    let pending = tokio::spawn(async move { router.handle(req(0, "eth_requestAccounts", json!([])), &ctx).await });
    let id = wait_for_approval(&f.state).await;
    f.state
        .approvals()
        .resolve(id, json!({ "address": MIXED_CASE, "chainId": "0x38" }))
        .unwrap();
    pending.await.unwrap();
    assert_eq!(f.state.sessions().get("app.example").unwrap().chain_id, 1);
}

#[tokio::test]
async fn rejected_approval_is_user_rejected() {
    let f = fixture();
    connect(&f, 1);
    let router = f.router.clone();
    let ctx = f.ctx.clone();
    let pending = tokio::spawn(async move {
        router
            .handle(req(4, "personal_sign", json!(["0x68656c6c6f", MIXED_CASE])), &ctx)
            .await
    });
    let id = wait_for_approval(&f.state).await;
    f.state.approvals().reject(id).unwrap();
    assert_eq!(error_code(pending.await.unwrap()), 4001);
}

#[tokio::test]
async fn switch_chain_rules() {
    let f = fixture();
    let switch = |id: u64, chain: &str| req(id, "wallet_switchEthereumChain", json!([{ "chainId": chain }]));

    // No session yet.
    assert_eq!(error_code(f.router.handle(switch(0, "0x89"), &f.ctx).await), 4100);

    connect(&f, 1);

    // Same chain: null, nothing changes, nothing queued.
    assert_eq!(result(f.router.handle(switch(1, "0x1"), &f.ctx).await), Value::Null);
    assert!(f.state.approvals().is_empty());

    // Known but unsupported, and unknown.
    assert_eq!(error_code(f.router.handle(switch(2, "0x38"), &f.ctx).await), 4902);
    assert_eq!(error_code(f.router.handle(switch(3, "0x3e7"), &f.ctx).await), 4902);
    assert_eq!(f.state.sessions().get("app.example").unwrap().chain_id, 1);

    assert_eq!(result(f.router.handle(switch(4, "0x89"), &f.ctx).await), Value::Null);
    assert_eq!(f.state.sessions().get("app.example").unwrap().chain_id, 137);
    assert_eq!(result(f.router.handle(req(5, "eth_chainId", json!([])), &f.ctx).await), json!("0x89"));

    assert_eq!(
        error_code(f.router.handle(req(6, "wallet_switchEthereumChain", json!([{}])), &f.ctx).await),
        -32602
    );
}

#[tokio::test]
async fn sessions_are_isolated_between_hosts() {
    let f = fixture();
    connect(&f, 137);
    let other = PageContext::from_url("https://other.example/", None).unwrap();
    assert_eq!(result(f.router.handle(req(0, "eth_accounts", json!([])), &other).await), json!([]));
    assert_eq!(result(f.router.handle(req(1, "eth_chainId", json!([])), &other).await), json!("0x1"));
}

#[tokio::test]
async fn add_chain_policies() {
    let f = fixture();

    let known = req(0, "wallet_addEthereumChain", json!([{ "chainId": "0x89", "rpcUrls": ["https://new.polygon.example"] }]));
    assert_eq!(result(f.router.handle(known, &f.ctx).await), Value::Null);
    assert_eq!(f.state.chains().rpc_url(137).unwrap(), "https://new.polygon.example");
    assert!(f.state.approvals().is_empty());

    let missing_url = req(1, "wallet_addEthereumChain", json!([{ "chainId": "0x38" }]));
    assert_eq!(error_code(f.router.handle(missing_url, &f.ctx).await), -32602);

    let router = f.router.clone();
    let ctx = f.ctx.clone();
    let pending = tokio::spawn(async move {
        let unknown = req(2, "wallet_addEthereumChain", json!([{ "chainId": "0x38", "rpcUrls": ["https://bsc.example"] }]));
        router.handle(unknown, &ctx).await
    });
    let id = wait_for_approval(&f.state).await;
    f.state.approvals().resolve(id, json!(true)).unwrap();
    assert_eq!(result(pending.await.unwrap()), Value::Null);
    assert!(f.state.chains().is_supported(56));
    assert_eq!(f.state.chains().rpc_url(56).unwrap(), "https://bsc.example");
}

#[tokio::test]
async fn watch_asset_validation_and_coercion() {
    let f = fixture();
    let bad_type = req(0, "wallet_watchAsset", json!({ "type": "ERC721", "options": { "address": "0x01" } }));
    assert_eq!(error_code(f.router.handle(bad_type, &f.ctx).await), -32602);

    let no_address = req(1, "wallet_watchAsset", json!({ "type": "ERC20", "options": {} }));
    assert_eq!(error_code(f.router.handle(no_address, &f.ctx).await), -32602);
    assert!(f.state.approvals().is_empty());

    let router = f.router.clone();
    let ctx = f.ctx.clone();
    let pending = tokio::spawn(async move {
        let ok = req(2, "wallet_watchAsset", json!({ "type": "ERC20", "options": { "address": "0x01", "symbol": "TKN" } }));
        router.handle(ok, &ctx).await
    });
    let id = wait_for_approval(&f.state).await;
    f.state.approvals().resolve(id, json!(1)).unwrap();
    assert_eq!(result(pending.await.unwrap()), json!(true));
}

/// Spawn `method` and settle its approval with `granted`.
async fn grant(f: &Fixture, method: &str, params: Value, granted: Value) -> ProviderResponse {
    let router = f.router.clone();
    let ctx = f.ctx.clone();
    let request = req(9, method, params);
    let pending = tokio::spawn(async move { router.handle(request, &ctx).await });
    let id = wait_for_approval(&f.state).await;
    f.state.approvals().resolve(id, granted).unwrap();
    pending.await.unwrap()
}

#[tokio::test]
async fn falsy_grant_is_user_rejection() {
    let f = fixture();
    connect(&f, 1);

    for granted in [Value::Null, json!(false), json!(0), json!("")] {
        let resp = grant(&f, "personal_sign", json!(["0x68656c6c6f", MIXED_CASE]), granted).await;
        assert_eq!(resp.id, 9);
        assert_eq!(error_code(resp), 4001);
    }

    let resp = grant(
        &f,
        "wallet_addEthereumChain",
        json!([{ "chainId": "0x38", "rpcUrls": ["https://bsc.example"] }]),
        json!(false),
    )
    .await;
    assert_eq!(error_code(resp), 4001);
    assert!(!f.state.chains().is_supported(56));

    let resp = grant(
        &f,
        "wallet_watchAsset",
        json!({ "type": "ERC20", "options": { "address": "0x01" } }),
        Value::Null,
    )
    .await;
    assert_eq!(error_code(resp), 4001);
    assert!(f.state.approvals().is_empty());
}

#[tokio::test]
async fn closed_context_cannot_enqueue() {
    let f = fixture();
    f.state.approvals().purge_context(&f.ctx.context_id);

    let resp = f
        .router
        .handle(req(0, "personal_sign", json!(["0x68656c6c6f", MIXED_CASE])), &f.ctx)
        .await;
    assert_eq!(error_code(resp), 4900);
    assert!(f.state.approvals().is_empty());
}

#[tokio::test]
async fn configured_default_chain_answers_reads_without_session() {
    let cfg = config::load_from_str(
        r#"
version: 1
default_chain_id: 137
chains:
  - { chain_id: 1, rpc_url: "https://rpc.one.example" }
  - { chain_id: 137, rpc_url: "https://rpc.polygon.example" }
"#,
    )
    .unwrap();
    let state = AppState::with_rpc(cfg, Arc::new(RecordingRpc::default()));
    let router = PortalRouter::new(state);
    let ctx = PageContext::from_url("https://app.example/", None).unwrap();

    assert_eq!(result(router.handle(req(0, "eth_chainId", json!([])), &ctx).await), json!("0x89"));
    assert_eq!(
        result(router.handle(req(1, "eth_blockNumber", json!([])), &ctx).await),
        json!("eth_blockNumber@137")
    );
}

#[tokio::test]
async fn ec_recover_returns_lowercase_signer() {
    let f = fixture();
    let signer = PrivateKeySigner::random();
    let sig = signer.sign_message_sync(b"hello bridge").unwrap();
    let sig_hex = hex::encode_prefixed(sig.as_bytes());
    let expected = format!("{:#x}", signer.address());
    assert_eq!(expected, expected.to_lowercase());

    let resp = f
        .router
        .handle(req(0, "personal_ecRecover", json!(["hello bridge", sig_hex])), &f.ctx)
        .await;
    assert_eq!(result(resp), json!(expected));

    let hex_msg = hex::encode_prefixed(b"hello bridge");
    let resp = f
        .router
        .handle(req(1, "personal_ecRecover", json!([hex_msg, sig_hex])), &f.ctx)
        .await;
    assert_eq!(result(resp), json!(expected));

    let resp = f.router.handle(req(2, "personal_ecRecover", json!(["x", "0x1234"])), &f.ctx).await;
    assert_eq!(error_code(resp), -32602);
}

#[tokio::test]
async fn typed_data_chain_must_match_session() {
    let f = fixture();
    connect(&f, 137);
    let typed = |chain: u64| {
        json!({
            "domain": { "name": "Mail", "chainId": chain },
            "types": {}, "primaryType": "Mail", "message": {}
        })
    };

    let wrong = req(0, "eth_signTypedData_v4", json!([MIXED_CASE, typed(1).to_string()]));
    assert_eq!(error_code(f.router.handle(wrong, &f.ctx).await), -32602);
    assert!(f.state.approvals().is_empty());

    let router = f.router.clone();
    let ctx = f.ctx.clone();
    let pending = tokio::spawn(async move {
        router
            .handle(req(1, "eth_signTypedData_v4", json!([MIXED_CASE, typed(137)])), &ctx)
            .await
    });
    let id = wait_for_approval(&f.state).await;
    f.state.approvals().resolve(id, json!("0xsig")).unwrap();
    assert_eq!(result(pending.await.unwrap()), json!("0xsig"));
}

#[tokio::test]
async fn passthrough_uses_session_chain_and_forwards_errors() {
    let f = fixture();
    assert_eq!(
        result(f.router.handle(req(0, "eth_blockNumber", json!([])), &f.ctx).await),
        json!("eth_blockNumber@1")
    );

    connect(&f, 137);
    assert_eq!(
        result(f.router.handle(req(1, "eth_feeHistory", json!([4, "latest", []])), &f.ctx).await),
        json!("eth_feeHistory@137")
    );

    let resp = f.router.handle(req(2, "eth_call", json!([{}, "latest"])), &f.ctx).await;
    let err = resp.error.unwrap();
    assert_eq!(err.code, -32000);
    assert_eq!(err.message, "execution reverted");

    let calls = f.rpc.calls.lock().unwrap().clone();
    assert_eq!(calls[1], (137, "https://rpc.polygon.example".to_string(), "eth_feeHistory".to_string()));
}

#[tokio::test]
async fn unknown_wallet_methods_are_unsupported() {
    let f = fixture();
    let resp = f.router.handle(req(0, "wallet_getCapabilities", json!([])), &f.ctx).await;
    assert_eq!(error_code(resp), 4200);
    assert!(f.rpc.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn revoke_drops_session() {
    let f = fixture();
    connect(&f, 1);
    let resp = f
        .router
        .handle(req(0, "wallet_revokePermissions", json!([{ "eth_accounts": {} }])), &f.ctx)
        .await;
    assert_eq!(result(resp), Value::Null);
    assert!(f.state.sessions().get("app.example").is_none());
}

#[tokio::test]
async fn rate_limit_spares_exempt_methods() {
    let f = fixture();
    for id in 0..3 {
        let resp = f.router.handle(req(id, "eth_blockNumber", json!([])), &f.ctx).await;
        assert!(resp.error.is_none());
    }
    let limited = f.router.handle(req(3, "eth_blockNumber", json!([])), &f.ctx).await;
    assert_eq!(error_code(limited), -32005);

    let exempt = f.router.handle(req(4, "eth_chainId", json!([])), &f.ctx).await;
    assert_eq!(result(exempt), json!("0x1"));
    assert_eq!(f.state.metrics().rate_limited.get(&[]), 1);
}

#[tokio::test]
async fn context_teardown_settles_pending_with_disconnected() {
    let f = fixture();
    let router = f.router.clone();
    let ctx = f.ctx.clone();
    let pending = tokio::spawn(async move { router.handle(req(0, "eth_requestAccounts", json!([])), &ctx).await });
    wait_for_approval(&f.state).await;

    portal::detach(&f.state, &f.ctx);

    assert_eq!(error_code(pending.await.unwrap()), 4900);
    assert!(f.state.approvals().is_empty());
    assert!(f.state.sessions().get("app.example").is_none());
}
