//! In-process metrics rendered by `/metrics`.

pub mod metrics;
