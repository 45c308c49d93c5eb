//! `window.ethereum` as an explicit object.
//!
//! Several wallets may inject into one page. The router keeps every provider
//! it has seen, remembers the last foreign one, and lets the wallet toggle
//! whether its own provider is the page's default without evicting others.

use std::sync::{Arc, Mutex};

use crate::lock_or_recover;
use crate::provider::Eip1193Provider;

pub type SharedProvider = Arc<dyn Eip1193Provider>;

struct RouterState {
    providers: Vec<SharedProvider>,
    wallet: SharedProvider,
    current: SharedProvider,
    last_injected: Option<SharedProvider>,
}

pub struct ProviderRouter {
    state: Mutex<RouterState>,
}

impl ProviderRouter {
    pub fn new(wallet: SharedProvider) -> Self {
        Self {
            state: Mutex::new(RouterState {
                providers: vec![Arc::clone(&wallet)],
                current: Arc::clone(&wallet),
                wallet,
                last_injected: None,
            }),
        }
    }

    /// Take over `window.ethereum`, keeping whatever was there before.
    pub fn install(wallet: SharedProvider, existing: Option<SharedProvider>) -> Self {
        let router = Self::new(wallet);
        if let Some(p) = existing {
            router.add_provider(p);
        }
        router
    }

    /// Getter behind `window.ethereum`.
    pub fn ethereum(&self) -> SharedProvider {
        Arc::clone(&lock_or_recover(&self.state).current)
    }

    /// Setter behind `window.ethereum = p`. Registers `p`; it does not
    /// replace the current provider.
    pub fn set_ethereum(&self, provider: SharedProvider) {
        self.add_provider(provider);
    }

    pub fn set_default_provider(&self, is_default: bool) {
        let mut st = lock_or_recover(&self.state);
        if is_default {
            st.current = Arc::clone(&st.wallet);
        } else if let Some(last) = st.last_injected.clone() {
            st.current = last;
        }
        tracing::debug!(is_default, "default provider toggled");
    }

    pub fn add_provider(&self, provider: SharedProvider) {
        let mut st = lock_or_recover(&self.state);
        if !st.providers.iter().any(|p| Arc::ptr_eq(p, &provider)) {
            st.providers.push(Arc::clone(&provider));
        }
        if !Arc::ptr_eq(&provider, &st.wallet) {
            st.last_injected = Some(provider);
        }
    }

    /// Every provider seen, in registration order.
    pub fn providers(&self) -> Vec<SharedProvider> {
        lock_or_recover(&self.state).providers.clone()
    }

    pub fn wallet(&self) -> SharedProvider {
        Arc::clone(&lock_or_recover(&self.state).wallet)
    }

    pub fn is_wallet_current(&self) -> bool {
        let st = lock_or_recover(&self.state);
        Arc::ptr_eq(&st.current, &st.wallet)
    }
}
