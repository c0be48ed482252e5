//! Connection configuration, sourced from environment variables once at
//! startup.

use anyhow::{Context, Result};
use std::env;

/// Fully-resolved connection settings. The URL carries credentials and must
/// never appear in log output or tool responses.
#[derive(Debug, Clone)]
pub struct PgConfig {
    pub database_url: String,
}

impl PgConfig {
    /// Reads `DATABASE_URL`, or composes one from the conventional
    /// `PGHOST`/`PGPORT`/`PGUSER`/`PGPASSWORD`/`PGDATABASE` variables.
    pub fn from_env() -> Result<Self> {
        if let Ok(url) = env::var("DATABASE_URL") {
            return Ok(Self { database_url: url });
        }

        let host = env::var("PGHOST").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("PGPORT").unwrap_or_else(|_| "5432".to_string());
        let user = env::var("PGUSER").context("PGUSER (or DATABASE_URL) must be set")?;
        let password = env::var("PGPASSWORD").unwrap_or_default();
        let database = env::var("PGDATABASE").context("PGDATABASE (or DATABASE_URL) must be set")?;

        let database_url = if password.is_empty() {
            format!("postgres://{}@{}:{}/{}", user, host, port, database)
        } else {
            format!("postgres://{}:{}@{}:{}/{}", user, password, host, port, database)
        };
        Ok(Self { database_url })
    }
}
