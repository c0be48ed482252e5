//! Mail API endpoint and token, sourced from environment variables.

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Base address of the mail store API.
    pub base_url: String,
    /// Bearer token. Never logged, never echoed into tool responses.
    pub token: String,
}

impl MailConfig {
    pub fn from_env() -> Result<Self> {
        let base_url = env::var("MAIL_API_URL").context("MAIL_API_URL must be set")?;
        let token = env::var("MAIL_API_TOKEN").context("MAIL_API_TOKEN must be set")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }
}
