//! Vault KV v2 tool server.
//!
//! Secret values pass through tool responses but are never written to the
//! log stream; error payloads carry the secret path, never the token.

pub mod adapter;
pub mod config;
pub mod tools;

/// Tag prefixed onto backend error messages.
pub const BACKEND: &str = "Vault";
