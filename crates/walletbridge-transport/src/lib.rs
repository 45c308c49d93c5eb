//! walletbridge transport: moves envelopes between isolated contexts.
//!
//! - [`channel`]: the byte pipe abstraction plus an in-memory pair
//! - [`messenger`]: request/reply correlation over one channel
//! - [`transport`]: a messenger bound to one topic and one type pair
//! - [`relay`]: content-script bridge between page window messages and the
//!   provider transport

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod channel;
pub mod messenger;
pub mod relay;
pub mod transport;

pub use channel::{Channel, Frame, SenderInfo};
pub use messenger::{Messenger, ReplyMeta};
pub use transport::{Transport, PROVIDER_REQUEST_TOPIC, SET_DEFAULT_PROVIDER_TOPIC};
