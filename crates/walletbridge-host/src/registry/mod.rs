//! In-memory registries shared by every page context.

pub mod chain;
pub mod session;

pub use chain::{ChainEntry, ChainRegistry};
pub use session::{Session, SessionRegistry};
