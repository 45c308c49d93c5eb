//! walletbridge host library entry.
//!
//! The portal host is the background side of the bridge: it answers provider
//! requests from page contexts against the session registry, the chain
//! registry and the approval queue, and pushes session changes back to pages.
//! The binary (`main.rs`) serves it over WebSocket; tests and single-process
//! setups attach contexts over in-memory channels.

pub mod app_state;
pub mod approval;
pub mod config;
pub mod obs;
pub mod policy;
pub mod portal;
pub mod push;
pub mod registry;
pub mod server;
pub mod sessions;
