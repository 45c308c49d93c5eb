//! EIP-6963 multi-provider discovery.

use std::sync::Arc;

use walletbridge_core::protocol::announce::{
    ProviderInfo, ANNOUNCE_PROVIDER_EVENT, ETHEREUM_INITIALIZED_EVENT, REQUEST_PROVIDER_EVENT,
};
use walletbridge_core::Result;

use crate::provider::InjectedProvider;
use crate::router::SharedProvider;

/// Events the wallet dispatches on the page's window.
#[derive(Clone)]
pub enum PageEvent {
    AnnounceProvider {
        info: ProviderInfo,
        provider: SharedProvider,
    },
    EthereumInitialized,
}

impl PageEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PageEvent::AnnounceProvider { .. } => ANNOUNCE_PROVIDER_EVENT,
            PageEvent::EthereumInitialized => ETHEREUM_INITIALIZED_EVENT,
        }
    }
}

/// `window.dispatchEvent`.
pub trait PageEventBus: Send + Sync {
    fn dispatch(&self, event: PageEvent);
}

/// Descriptor with a fresh per-session uuid.
pub fn provider_info(name: &str, rdns: &str, icon: &str) -> ProviderInfo {
    ProviderInfo {
        icon: icon.to_string(),
        name: name.to_string(),
        rdns: rdns.to_string(),
        uuid: uuid::Uuid::new_v4().to_string(),
    }
}

pub struct Eip6963Announcer {
    info: ProviderInfo,
    provider: SharedProvider,
    bus: Arc<dyn PageEventBus>,
}

impl Eip6963Announcer {
    pub fn new(info: ProviderInfo, provider: &InjectedProvider, bus: Arc<dyn PageEventBus>) -> Result<Self> {
        info.validate()?;
        Ok(Self {
            info,
            provider: Arc::new(provider.announced_copy()),
            bus,
        })
    }

    pub fn info(&self) -> &ProviderInfo {
        &self.info
    }

    pub fn announce(&self) {
        tracing::debug!(rdns = %self.info.rdns, "announcing provider");
        self.bus.dispatch(PageEvent::AnnounceProvider {
            info: self.info.clone(),
            provider: Arc::clone(&self.provider),
        });
    }

    /// Re-announce when a dapp asks. Returns whether the event was ours.
    pub fn on_page_event(&self, name: &str) -> bool {
        if name != REQUEST_PROVIDER_EVENT {
            return false;
        }
        self.announce();
        true
    }
}
