//! Request admission policy.

pub mod rate_limit;

pub use rate_limit::{HostRateLimiter, PolicyDecision};
