//! Registry endpoints, sourced from environment variables. Both endpoints
//! default to the public npm services and need no credentials.

use anyhow::Result;
use std::env;

#[derive(Debug, Clone)]
pub struct NpmConfig {
    /// Package metadata and search, e.g. `https://registry.npmjs.org`.
    pub registry_url: String,
    /// Download-count API, e.g. `https://api.npmjs.org`.
    pub downloads_url: String,
}

impl NpmConfig {
    pub fn from_env() -> Result<Self> {
        let registry_url = env::var("NPM_REGISTRY_URL")
            .unwrap_or_else(|_| "https://registry.npmjs.org".to_string());
        let downloads_url =
            env::var("NPM_DOWNLOADS_URL").unwrap_or_else(|_| "https://api.npmjs.org".to_string());
        Ok(Self {
            registry_url: registry_url.trim_end_matches('/').to_string(),
            downloads_url: downloads_url.trim_end_matches('/').to_string(),
        })
    }
}
