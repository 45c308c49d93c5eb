//! Pure request planning.
//!
//! `plan` decides how a request is answered from the method, its params and
//! a snapshot of registry state. It performs no I/O and mutates nothing; the
//! router executes the returned [`Outcome`].

use serde_json::{json, Value};

use walletbridge_core::chain::{chain_id_from_value, to_hex};
use walletbridge_core::{BridgeError, Result};

use crate::portal::method::Method;
use crate::portal::recover::ec_recover;
use crate::registry::{ChainEntry, ChainRegistry, Session};

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Immediate(Value),
    Passthrough { chain_id: u64 },
    Mutate(Mutation),
    Approval(ApprovalPlan),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    SwitchChain { chain_id: u64 },
    RegisterRpc { chain_id: u64, rpc_url: Option<String> },
    RevokeSession,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalPlan {
    pub on_grant: OnGrant,
}

/// What to do with the value the user approved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnGrant {
    /// `{address, chainId}` becomes the host's session.
    CreateSession,
    AddChain(ChainEntry),
    CoerceBool,
    /// Returned to the page as is (signatures, tx hashes).
    Forward,
}

fn approval(on_grant: OnGrant) -> Outcome {
    Outcome::Approval(ApprovalPlan { on_grant })
}

fn object_param<'a>(params: &'a [Value], method: &Method) -> Result<&'a serde_json::Map<String, Value>> {
    params
        .first()
        .and_then(Value::as_object)
        .ok_or_else(|| BridgeError::InvalidParams(format!("{}: expected an object param", method.as_str())))
}

pub fn plan(
    method: &Method,
    params: Option<&[Value]>,
    session: Option<&Session>,
    chains: &ChainRegistry,
) -> Result<Outcome> {
    let params = params.unwrap_or(&[]);
    let active_chain = session
        .map(|s| s.chain_id)
        .unwrap_or_else(|| chains.default_chain_id());

    match method {
        Method::EthChainId => Ok(Outcome::Immediate(json!(to_hex(active_chain)))),
        Method::EthAccounts => Ok(Outcome::Immediate(match session {
            Some(s) => json!([s.address_lower()]),
            None => json!([]),
        })),
        Method::EthCoinbase => Ok(Outcome::Immediate(match session {
            Some(s) => json!(s.address_lower()),
            None => Value::Null,
        })),
        Method::EthRequestAccounts => Ok(match session {
            Some(s) => Outcome::Immediate(json!([s.address_lower()])),
            None => approval(OnGrant::CreateSession),
        }),

        Method::EthBlockNumber
        | Method::EthGetBalance
        | Method::EthCall
        | Method::EthEstimateGas
        | Method::EthGasPrice
        | Method::EthGetCode
        | Method::EthGetLogs
        | Method::EthGetTransactionByHash
        | Method::Other(_) => Ok(Outcome::Passthrough {
            chain_id: active_chain,
        }),

        Method::EthSignTypedDataV4 => {
            check_typed_data_chain(params, active_chain)?;
            Ok(approval(OnGrant::Forward))
        }
        Method::EthSendTransaction
        | Method::EthSignTransaction
        | Method::PersonalSign
        | Method::EthSignTypedData
        | Method::EthSignTypedDataV3 => Ok(approval(OnGrant::Forward)),

        Method::WalletSwitchEthereumChain => {
            let obj = object_param(params, method)?;
            let chain_id = obj
                .get("chainId")
                .ok_or_else(|| BridgeError::InvalidParams("chainId is required".into()))
                .and_then(chain_id_from_value)?;
            if !chains.is_supported(chain_id) {
                return Err(BridgeError::ChainNotSupported(chain_id));
            }
            let Some(s) = session else {
                return Err(BridgeError::Unauthorized("connect before switching chains".into()));
            };
            if s.chain_id == chain_id {
                return Ok(Outcome::Immediate(Value::Null));
            }
            Ok(Outcome::Mutate(Mutation::SwitchChain { chain_id }))
        }

        Method::WalletAddEthereumChain => {
            let obj = object_param(params, method)?;
            let chain_id = obj
                .get("chainId")
                .ok_or_else(|| BridgeError::InvalidParams("chainId is required".into()))
                .and_then(chain_id_from_value)?;
            let rpc_url = obj
                .get("rpcUrls")
                .and_then(Value::as_array)
                .and_then(|urls| urls.iter().filter_map(Value::as_str).find(|u| !u.trim().is_empty()))
                .map(str::to_string);

            if chains.is_supported(chain_id) {
                return Ok(Outcome::Mutate(Mutation::RegisterRpc { chain_id, rpc_url }));
            }
            let rpc_url = rpc_url
                .ok_or_else(|| BridgeError::InvalidParams("rpcUrls must contain a URL".into()))?;
            Ok(approval(OnGrant::AddChain(ChainEntry {
                chain_id,
                rpc_url,
                supported: true,
            })))
        }

        Method::WalletWatchAsset => {
            let obj = object_param(params, method)?;
            match obj.get("type").and_then(Value::as_str) {
                Some("ERC20") => {}
                other => {
                    return Err(BridgeError::InvalidParams(format!(
                        "unsupported asset type: {}",
                        other.unwrap_or("<missing>")
                    )))
                }
            }
            let has_address = obj
                .get("options")
                .and_then(|o| o.get("address"))
                .and_then(Value::as_str)
                .is_some_and(|a| !a.is_empty());
            if !has_address {
                return Err(BridgeError::InvalidParams("options.address is required".into()));
            }
            Ok(approval(OnGrant::CoerceBool))
        }

        Method::PersonalEcRecover => Ok(Outcome::Immediate(json!(ec_recover(params)?))),

        Method::WalletRevokePermissions => Ok(Outcome::Mutate(Mutation::RevokeSession)),

        Method::UnknownWallet(name) => Err(BridgeError::UnsupportedMethod(name.clone())),
    }
}

/// `eth_signTypedData_v4` params are `[address, typedData]`, though some
/// dapps swap them. Typed data may be an object or its JSON string form.
fn check_typed_data_chain(params: &[Value], active_chain: u64) -> Result<()> {
    let typed = params.iter().find_map(|p| match p {
        Value::Object(_) if p.get("domain").is_some() => Some(p.clone()),
        Value::String(s) if s.trim_start().starts_with('{') => serde_json::from_str::<Value>(s)
            .ok()
            .filter(|v| v.get("domain").is_some()),
        _ => None,
    });
    let Some(typed) = typed else {
        return Err(BridgeError::InvalidParams("typed data is missing".into()));
    };

    let Some(domain_chain) = typed.get("domain").and_then(|d| d.get("chainId")) else {
        return Ok(());
    };
    let domain_chain = chain_id_from_value(domain_chain)?;
    if domain_chain != active_chain {
        return Err(BridgeError::InvalidParams(format!(
            "typed data chainId {domain_chain} does not match active chain {active_chain}"
        )));
    }
    Ok(())
}

/// JavaScript-style truthiness, for results the page expects as a boolean.
pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
