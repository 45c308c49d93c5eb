//! Page bootstrap: gate, build, install, announce.

use std::sync::Arc;

use walletbridge_core::host::dapp_host;
use walletbridge_core::protocol::announce::ProviderInfo;
use walletbridge_core::{BridgeError, Result};
use walletbridge_transport::transport::default_provider_transport;
use walletbridge_transport::Messenger;

use crate::announce::{Eip6963Announcer, PageEvent, PageEventBus};
use crate::inject::{should_inject, DocumentInfo};
use crate::provider::InjectedProvider;
use crate::router::{ProviderRouter, SharedProvider};

pub struct BootstrapConfig {
    pub info: ProviderInfo,
    pub page_url: String,
    pub document: DocumentInfo,
}

pub struct Injected {
    pub provider: InjectedProvider,
    pub router: Arc<ProviderRouter>,
    pub announcer: Eip6963Announcer,
}

/// Returns `None` when the document must not get a provider.
/// `existing` is whatever `window.ethereum` held before us.
pub fn bootstrap(
    messenger: Arc<Messenger>,
    cfg: BootstrapConfig,
    existing: Option<SharedProvider>,
    bus: Arc<dyn PageEventBus>,
) -> Result<Option<Injected>> {
    if !should_inject(&cfg.document) {
        tracing::debug!(path = %cfg.document.pathname, "not an html document; skipping injection");
        return Ok(None);
    }
    let host = dapp_host(&cfg.page_url)
        .ok_or_else(|| BridgeError::InvalidParams(format!("not a dapp page: {}", cfg.page_url)))?;

    let provider = InjectedProvider::new(Arc::clone(&messenger), &host);
    let router = Arc::new(ProviderRouter::install(
        Arc::new(provider.clone()),
        existing,
    ));

    let weak = Arc::downgrade(&router);
    default_provider_transport(messenger).reply(move |is_default: bool, _meta| {
        let weak = weak.clone();
        async move {
            if let Some(router) = weak.upgrade() {
                router.set_default_provider(is_default);
            }
            Ok(())
        }
    });

    let announcer = Eip6963Announcer::new(cfg.info, &provider, Arc::clone(&bus))?;
    announcer.announce();
    bus.dispatch(PageEvent::EthereumInitialized);

    tracing::info!(%host, "provider injected");
    Ok(Some(Injected {
        provider,
        router,
        announcer,
    }))
}
