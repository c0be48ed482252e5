//! Datadog credentials and endpoint, sourced from environment variables.

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct DatadogConfig {
    pub api_key: String,
    pub app_key: String,
    /// Fully-qualified API base, e.g. `https://api.datadoghq.com`.
    pub base_url: String,
}

impl DatadogConfig {
    /// Reads `DD_API_KEY`, `DD_APP_KEY` and optionally `DD_SITE`
    /// (default `datadoghq.com`) or a full `DD_API_URL` override.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("DD_API_KEY").context("DD_API_KEY must be set")?;
        let app_key = env::var("DD_APP_KEY").context("DD_APP_KEY must be set")?;
        let base_url = match env::var("DD_API_URL") {
            Ok(url) => url.trim_end_matches('/').to_string(),
            Err(_) => {
                let site = env::var("DD_SITE").unwrap_or_else(|_| "datadoghq.com".to_string());
                format!("https://api.{}", site)
            }
        };
        Ok(Self {
            api_key,
            app_key,
            base_url,
        })
    }
}
