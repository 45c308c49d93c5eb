//! walletbridge core: wire-level contracts shared by the page, the content
//! script, and the background portal host.
//!
//! This crate defines the message envelopes, the provider request/response
//! shapes, the JSON-RPC error taxonomy, and the small helpers (host
//! normalization, chain id formatting) every other crate relies on. It carries
//! no async runtime or transport dependencies so it can be reused in any
//! execution context.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here.
//! Malformed input surfaces as `BridgeError`/`Result` instead.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod chain;
pub mod error;
pub mod host;
pub mod protocol;

/// Shared result type.
pub use error::{BridgeError, ErrorCode, Result, RpcError};
