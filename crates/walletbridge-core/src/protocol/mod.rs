//! Protocol modules.
//!
//! - `envelope`: topic-addressed messenger frames (send / reply).
//! - `rpc`: EIP-1193 provider requests and responses.
//! - `window`: the page <-> content-script `postMessage` shape.
//! - `push`: host-scoped out-of-band session events.
//! - `announce`: EIP-6963 provider descriptor.
//!
//! All decoders are panic-free: malformed input is reported as `BridgeError`.

pub mod announce;
pub mod envelope;
pub mod push;
pub mod rpc;
pub mod window;
