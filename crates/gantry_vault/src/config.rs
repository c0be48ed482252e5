//! Vault endpoint and token, sourced from environment variables.

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Base address, e.g. `https://vault.internal:8200`.
    pub address: String,
    /// Client token. Never logged, never echoed into tool responses.
    pub token: String,
    /// KV v2 mount point (default `secret`).
    pub mount: String,
}

impl VaultConfig {
    pub fn from_env() -> Result<Self> {
        let address = env::var("VAULT_ADDR").context("VAULT_ADDR must be set")?;
        let token = env::var("VAULT_TOKEN").context("VAULT_TOKEN must be set")?;
        let mount = env::var("VAULT_MOUNT").unwrap_or_else(|_| "secret".to_string());
        Ok(Self {
            address: address.trim_end_matches('/').to_string(),
            token,
            mount,
        })
    }
}
