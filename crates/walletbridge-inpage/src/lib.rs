//! walletbridge inpage: the page-side half of the bridge.
//!
//! [`provider::InjectedProvider`] is the EIP-1193 object dapps talk to.
//! [`router::ProviderRouter`] stands in for `window.ethereum` when several
//! wallets coexist, [`announce`] implements EIP-6963 discovery, and
//! [`bootstrap`] wires them together behind [`inject::should_inject`].

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::sync::{Mutex, MutexGuard};

pub mod announce;
pub mod bootstrap;
pub mod inject;
pub mod provider;
pub mod router;

pub use bootstrap::{bootstrap, BootstrapConfig, Injected};
pub use provider::{Eip1193Provider, InjectedProvider, ProviderEvent};
pub use router::{ProviderRouter, SharedProvider};

/// Acquire a mutex, recovering the guard if it was poisoned.
pub(crate) fn lock_or_recover<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("mutex poisoned; recovering");
            poisoned.into_inner()
        }
    }
}
