//! PostgreSQL tool server.
//!
//! Opens a brand-new connection per call and closes it unconditionally
//! afterwards — chosen deliberately to avoid stale-connection failures over
//! long server lifetimes. Only read-only statements are accepted; see
//! [`readonly`].

pub mod adapter;
pub mod config;
pub mod readonly;
pub mod rows;
pub mod tools;

/// Tag prefixed onto backend error messages.
pub const BACKEND: &str = "PostgreSQL";
