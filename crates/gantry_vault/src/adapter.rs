//! Persistent-client adapter for the Vault KV v2 HTTP API.

use crate::config::VaultConfig;
use crate::BACKEND;
use gantry_core::ToolError;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

pub struct VaultAdapter {
    client: reqwest::Client,
    config: VaultConfig,
}

/// Mapped result of one operation plus elapsed wall time.
#[derive(Debug)]
pub struct ApiOutcome {
    pub data: Value,
    pub elapsed_ms: u128,
}

impl VaultAdapter {
    pub fn new(config: VaultConfig) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ToolError::unexpected(format!("building HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// One-shot startup probe. A standby node (429) still proves
    /// reachability and a usable TLS/auth path.
    pub async fn test_connectivity(&self) -> Result<(), ToolError> {
        let url = format!("{}/v1/sys/health", self.config.address);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(classify_transport)?;
        match response.status().as_u16() {
            200 | 429 | 473 => Ok(()),
            status => Err(ToolError::backend(
                BACKEND,
                format!("health endpoint answered status {}", status),
            )
            .with_status(status)),
        }
    }

    /// Read one secret version: its key/value data plus version metadata.
    pub async fn read_secret(
        &self,
        path: &str,
        version: Option<i64>,
    ) -> Result<ApiOutcome, ToolError> {
        let started = Instant::now();
        let url = format!("{}/v1/{}/data/{}", self.config.address, self.config.mount, path);
        let mut request = self.client.get(url).header("X-Vault-Token", &self.config.token);
        if let Some(version) = version {
            request = request.query(&[("version", version.to_string())]);
        }
        let body = read_body(request.send().await.map_err(classify_transport)?).await?;

        let data = body.pointer("/data/data").cloned().unwrap_or_else(|| json!({}));
        let metadata = body.pointer("/data/metadata").cloned().unwrap_or_else(|| json!({}));
        Ok(ApiOutcome {
            data: json!({
                "data": data,
                "version": metadata.get("version").cloned().unwrap_or(Value::Null),
                "createdTime": metadata.get("created_time").cloned().unwrap_or(Value::Null),
                "destroyed": metadata.get("destroyed").cloned().unwrap_or(Value::Null),
            }),
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    /// List the child keys under a path prefix.
    pub async fn list_secrets(&self, path: &str) -> Result<ApiOutcome, ToolError> {
        let started = Instant::now();
        let url = format!(
            "{}/v1/{}/metadata/{}",
            self.config.address, self.config.mount, path
        );
        let response = self
            .client
            .get(url)
            .query(&[("list", "true")])
            .header("X-Vault-Token", &self.config.token)
            .send()
            .await
            .map_err(classify_transport)?;
        let body = read_body(response).await?;

        let keys = body.pointer("/data/keys").cloned().unwrap_or_else(|| json!([]));
        Ok(ApiOutcome {
            data: keys,
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    /// Version history and timestamps for one secret, without its values.
    pub async fn secret_metadata(&self, path: &str) -> Result<ApiOutcome, ToolError> {
        let started = Instant::now();
        let url = format!(
            "{}/v1/{}/metadata/{}",
            self.config.address, self.config.mount, path
        );
        let response = self
            .client
            .get(url)
            .header("X-Vault-Token", &self.config.token)
            .send()
            .await
            .map_err(classify_transport)?;
        let body = read_body(response).await?;

        let data = body.get("data").cloned().unwrap_or_else(|| json!({}));
        Ok(ApiOutcome {
            data: json!({
                "currentVersion": data.get("current_version").cloned().unwrap_or(Value::Null),
                "oldestVersion": data.get("oldest_version").cloned().unwrap_or(Value::Null),
                "createdTime": data.get("created_time").cloned().unwrap_or(Value::Null),
                "updatedTime": data.get("updated_time").cloned().unwrap_or(Value::Null),
                "versions": data.get("versions").cloned().unwrap_or_else(|| json!({})),
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
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| match status.as_u16() {
            404 => "secret not found".to_string(),
            403 => "permission denied".to_string(),
            code => format!("request failed with status {}", code),
        });
    Err(ToolError::backend(BACKEND, message).with_status(status.as_u16()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::FaultKind;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(base_url: &str) -> VaultAdapter {
        VaultAdapter::new(VaultConfig {
            address: base_url.to_string(),
            token: "test-token".to_string(),
            mount: "secret".to_string(),
        })
        .expect("client builds")
    }

    #[tokio::test]
    async fn test_read_secret_maps_data_and_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/secret/data/app/db"))
            .and(header("X-Vault-Token", "test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "data": { "username": "svc", "password": "hunter2" },
                    "metadata": { "version": 3, "created_time": "2026-01-01T00:00:00Z", "destroyed": false }
                }
            })))
            .mount(&server)
            .await;

        let outcome = adapter(&server.uri())
            .read_secret("app/db", None)
            .await
            .expect("secret");
        assert_eq!(outcome.data["data"]["username"], "svc");
        assert_eq!(outcome.data["version"], 3);
    }

    #[tokio::test]
    async fn test_missing_secret_is_backend_fault() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/secret/data/app/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "errors": [] })))
            .mount(&server)
            .await;

        let err = adapter(&server.uri())
            .read_secret("app/missing", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, FaultKind::Backend);
        assert_eq!(err.status, Some(404));
        assert!(err.message.contains("not found"));
    }

    #[tokio::test]
    async fn test_permission_denied_keeps_vault_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/secret/metadata/forbidden"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(json!({ "errors": ["permission denied"] })),
            )
            .mount(&server)
            .await;

        let err = adapter(&server.uri())
            .secret_metadata("forbidden")
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(403));
        assert!(err.message.contains("permission denied"));
    }

    #[tokio::test]
    async fn test_list_secrets_returns_keys() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/secret/metadata/app"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "keys": ["db", "cache/"] }
            })))
            .mount(&server)
            .await;

        let outcome = adapter(&server.uri()).list_secrets("app").await.expect("list");
        assert_eq!(outcome.data, json!(["db", "cache/"]));
    }

    #[tokio::test]
    async fn test_unreachable_vault_is_connection_fault() {
        let err = adapter("http://127.0.0.1:9")
            .read_secret("app/db", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, FaultKind::Connection);
    }

    #[tokio::test]
    async fn test_standby_health_is_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/sys/health"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({ "standby": true })))
            .mount(&server)
            .await;

        assert!(adapter(&server.uri()).test_connectivity().await.is_ok());
    }
}
