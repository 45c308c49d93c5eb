//! Provider method table.

/// How a method is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    /// Answered from the host's session.
    SessionRead,
    /// Forwarded to the chain's RPC endpoint.
    Passthrough,
    /// Needs an explicit user decision.
    Approval,
    /// Changes registry state without a decision.
    Mutate,
    /// Answered locally from the params alone.
    Compute,
}

impl MethodKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MethodKind::SessionRead => "session_read",
            MethodKind::Passthrough => "passthrough",
            MethodKind::Approval => "approval",
            MethodKind::Mutate => "mutate",
            MethodKind::Compute => "compute",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    EthChainId,
    EthAccounts,
    EthCoinbase,
    EthRequestAccounts,

    EthBlockNumber,
    EthGetBalance,
    EthCall,
    EthEstimateGas,
    EthGasPrice,
    EthGetCode,
    EthGetLogs,
    EthGetTransactionByHash,

    EthSendTransaction,
    EthSignTransaction,
    PersonalSign,
    EthSignTypedData,
    EthSignTypedDataV3,
    EthSignTypedDataV4,

    WalletSwitchEthereumChain,
    WalletAddEthereumChain,
    WalletWatchAsset,
    WalletRevokePermissions,
    PersonalEcRecover,

    /// `wallet_*` this wallet does not implement.
    UnknownWallet(String),
    /// Anything else goes to the RPC endpoint untouched.
    Other(String),
}

impl Method {
    pub fn parse(name: &str) -> Method {
        match name {
            "eth_chainId" => Method::EthChainId,
            "eth_accounts" => Method::EthAccounts,
            "eth_coinbase" => Method::EthCoinbase,
            "eth_requestAccounts" => Method::EthRequestAccounts,
            "eth_blockNumber" => Method::EthBlockNumber,
            "eth_getBalance" => Method::EthGetBalance,
            "eth_call" => Method::EthCall,
            "eth_estimateGas" => Method::EthEstimateGas,
            "eth_gasPrice" => Method::EthGasPrice,
            "eth_getCode" => Method::EthGetCode,
            "eth_getLogs" => Method::EthGetLogs,
            "eth_getTransactionByHash" => Method::EthGetTransactionByHash,
            "eth_sendTransaction" => Method::EthSendTransaction,
            "eth_signTransaction" => Method::EthSignTransaction,
            "personal_sign" => Method::PersonalSign,
            "eth_signTypedData" => Method::EthSignTypedData,
            "eth_signTypedData_v3" => Method::EthSignTypedDataV3,
            "eth_signTypedData_v4" => Method::EthSignTypedDataV4,
            "wallet_switchEthereumChain" => Method::WalletSwitchEthereumChain,
            "wallet_addEthereumChain" => Method::WalletAddEthereumChain,
            "wallet_watchAsset" => Method::WalletWatchAsset,
            "wallet_revokePermissions" => Method::WalletRevokePermissions,
            "personal_ecRecover" => Method::PersonalEcRecover,
            other if other.starts_with("wallet_") => Method::UnknownWallet(other.to_string()),
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::EthChainId => "eth_chainId",
            Method::EthAccounts => "eth_accounts",
            Method::EthCoinbase => "eth_coinbase",
            Method::EthRequestAccounts => "eth_requestAccounts",
            Method::EthBlockNumber => "eth_blockNumber",
            Method::EthGetBalance => "eth_getBalance",
            Method::EthCall => "eth_call",
            Method::EthEstimateGas => "eth_estimateGas",
            Method::EthGasPrice => "eth_gasPrice",
            Method::EthGetCode => "eth_getCode",
            Method::EthGetLogs => "eth_getLogs",
            Method::EthGetTransactionByHash => "eth_getTransactionByHash",
            Method::EthSendTransaction => "eth_sendTransaction",
            Method::EthSignTransaction => "eth_signTransaction",
            Method::PersonalSign => "personal_sign",
            Method::EthSignTypedData => "eth_signTypedData",
            Method::EthSignTypedDataV3 => "eth_signTypedData_v3",
            Method::EthSignTypedDataV4 => "eth_signTypedData_v4",
            Method::WalletSwitchEthereumChain => "wallet_switchEthereumChain",
            Method::WalletAddEthereumChain => "wallet_addEthereumChain",
            Method::WalletWatchAsset => "wallet_watchAsset",
            Method::WalletRevokePermissions => "wallet_revokePermissions",
            Method::PersonalEcRecover => "personal_ecRecover",
            Method::UnknownWallet(name) | Method::Other(name) => name,
        }
    }

    pub fn kind(&self) -> MethodKind {
        match self {
            Method::EthChainId | Method::EthAccounts | Method::EthCoinbase => MethodKind::SessionRead,

            Method::EthBlockNumber
            | Method::EthGetBalance
            | Method::EthCall
            | Method::EthEstimateGas
            | Method::EthGasPrice
            | Method::EthGetCode
            | Method::EthGetLogs
            | Method::EthGetTransactionByHash
            | Method::Other(_) => MethodKind::Passthrough,

            Method::EthRequestAccounts
            | Method::EthSendTransaction
            | Method::EthSignTransaction
            | Method::PersonalSign
            | Method::EthSignTypedData
            | Method::EthSignTypedDataV3
            | Method::EthSignTypedDataV4
            | Method::WalletAddEthereumChain
            | Method::WalletWatchAsset => MethodKind::Approval,

            Method::WalletSwitchEthereumChain | Method::WalletRevokePermissions => MethodKind::Mutate,

            Method::PersonalEcRecover | Method::UnknownWallet(_) => MethodKind::Compute,
        }
    }

    pub fn is_signing(&self) -> bool {
        matches!(
            self,
            Method::EthSendTransaction
                | Method::EthSignTransaction
                | Method::PersonalSign
                | Method::EthSignTypedData
                | Method::EthSignTypedDataV3
                | Method::EthSignTypedDataV4
        )
    }

    /// Cheap or user-gated methods skip the per-host rate limit.
    pub fn is_rate_limit_exempt(&self) -> bool {
        self.is_signing()
            || self.as_str().starts_with("wallet_")
            || matches!(
                self,
                Method::EthChainId
                    | Method::EthAccounts
                    | Method::EthRequestAccounts
                    | Method::PersonalEcRecover
            )
    }
}
