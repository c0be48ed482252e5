//! Datadog tool server.
//!
//! One `reqwest::Client` is built at startup and reused for every call; the
//! client's own pool handles concurrent outstanding requests.

pub mod adapter;
pub mod config;
pub mod tools;

/// Tag prefixed onto backend error messages.
pub const BACKEND: &str = "Datadog";
