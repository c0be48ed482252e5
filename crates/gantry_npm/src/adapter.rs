//! Persistent-client adapter for the npm registry HTTP API.

use crate::config::NpmConfig;
use crate::BACKEND;
use gantry_core::ToolError;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

pub struct NpmAdapter {
    client: reqwest::Client,
    config: NpmConfig,
}

/// Mapped result of one operation plus elapsed wall time.
#[derive(Debug)]
pub struct ApiOutcome {
    pub data: Value,
    pub elapsed_ms: u128,
}

impl NpmAdapter {
    pub fn new(config: NpmConfig) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ToolError::unexpected(format!("building HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// One-shot startup probe against the registry's ping endpoint.
    pub async fn test_connectivity(&self) -> Result<(), ToolError> {
        let url = format!("{}/-/ping", self.config.registry_url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(classify_transport)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ToolError::backend(
                BACKEND,
                format!("ping answered status {}", response.status().as_u16()),
            )
            .with_status(response.status().as_u16()))
        }
    }

    /// Metadata for one package: latest version, description, license and
    /// its dependency table.
    pub async fn package_info(&self, name: &str) -> Result<ApiOutcome, ToolError> {
        let started = Instant::now();
        // Scoped names carry a slash that must stay inside one path segment.
        let encoded = name.replace('/', "%2F");
        let url = format!("{}/{}", self.config.registry_url, encoded);
        let body = read_body(
            self.client.get(url).send().await.map_err(classify_transport)?,
        )
        .await?;

        let latest = body
            .pointer("/dist-tags/latest")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let latest_manifest = body
            .get("versions")
            .and_then(|versions| versions.get(&latest))
            .cloned()
            .unwrap_or_else(|| json!({}));

        Ok(ApiOutcome {
            data: json!({
                "name": body.get("name").cloned().unwrap_or(Value::Null),
                "latestVersion": latest,
                "description": body.get("description").cloned().unwrap_or(Value::Null),
                "license": body.get("license").cloned().unwrap_or(Value::Null),
                "homepage": body.get("homepage").cloned().unwrap_or(Value::Null),
                "dependencies": latest_manifest.get("dependencies").cloned().unwrap_or_else(|| json!({})),
                "modified": body.pointer("/time/modified").cloned().unwrap_or(Value::Null),
            }),
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    /// Full-text package search.
    pub async fn search_packages(&self, query: &str, limit: i64) -> Result<ApiOutcome, ToolError> {
        let started = Instant::now();
        let url = format!("{}/-/v1/search", self.config.registry_url);
        let response = self
            .client
            .get(url)
            .query(&[("text", query.to_string()), ("size", limit.to_string())])
            .send()
            .await
            .map_err(classify_transport)?;
        let body = read_body(response).await?;

        let results: Vec<Value> = body
            .get("objects")
            .and_then(Value::as_array)
            .map(|objects| {
                objects
                    .iter()
                    .map(|object| {
                        let package = object.get("package").cloned().unwrap_or_else(|| json!({}));
                        json!({
                            "name": package.get("name").cloned().unwrap_or(Value::Null),
                            "version": package.get("version").cloned().unwrap_or(Value::Null),
                            "description": package.get("description").cloned().unwrap_or(Value::Null),
                            "score": object.pointer("/score/final").cloned().unwrap_or(Value::Null),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ApiOutcome {
            data: Value::Array(results),
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    /// Download count for one package over a named period.
    pub async fn download_counts(&self, name: &str, period: &str) -> Result<ApiOutcome, ToolError> {
        let started = Instant::now();
        let url = format!(
            "{}/downloads/point/{}/{}",
            self.config.downloads_url, period, name
        );
        let body = read_body(
            self.client.get(url).send().await.map_err(classify_transport)?,
        )
        .await?;

        Ok(ApiOutcome {
            data: json!({
                "package": body.get("package").cloned().unwrap_or(Value::Null),
                "period": period,
                "start": body.get("start").cloned().unwrap_or(Value::Null),
                "end": body.get("end").cloned().unwrap_or(Value::Null),
                "downloads": body.get("downloads").cloned().unwrap_or(Value::Null),
            }),
            elapsed_ms: started.elapsed().as_millis(),
        })
    }
}

// ============================================================================
// Error classification
// ============================================================================

pub(crate) fn classify_transport(err: reqwest::Error) -> ToolError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        ToolError::connection(BACKEND, err.without_url().to_string())
    } else {
        ToolError::unexpected(err.without_url().to_string())
    }
}

async fn read_body(response: reqwest::Response) -> Result<Value, ToolError> {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or_else(|_| json!({}));
    if status.is_success() {
        return Ok(body);
    }
    let message = body
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| match status.as_u16() {
            404 => "package not found".to_string(),
            code => format!("request failed with status {}", code),
        });
    Err(ToolError::backend(BACKEND, message).with_status(status.as_u16()))
}

// ============================================================================
// Tests
// ============================================================================
