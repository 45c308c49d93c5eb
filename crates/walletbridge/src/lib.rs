//! Top-level facade crate for walletbridge.
//!
//! Re-exports the wire types, the messenger, the portal host and the page-side
//! provider so embedders can depend on a single crate.

pub mod core {
    pub use walletbridge_core::*;
}

pub mod transport {
    pub use walletbridge_transport::*;
}

pub mod host {
    pub use walletbridge_host::*;
}

pub mod inpage {
    pub use walletbridge_inpage::*;
}
