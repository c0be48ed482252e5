//! Mailbox tool server.
//!
//! Wraps an HTTP mail-store API (one bearer token, one account). Message
//! bodies pass through tool responses; the token never does.

pub mod adapter;
pub mod config;
pub mod tools;

/// Tag prefixed onto backend error messages.
pub const BACKEND: &str = "Mail";
