//! Persistent-client adapter for the mail store HTTP API.

use crate::config::MailConfig;
use crate::BACKEND;
use gantry_core::ToolError;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

pub struct MailAdapter {
    client: reqwest::Client,
    config: MailConfig,
}

/// Mapped result of one operation plus elapsed wall time.
#[derive(Debug)]
pub struct ApiOutcome {
    pub data: Value,
    pub elapsed_ms: u128,
}

impl MailAdapter {
    pub fn new(config: MailConfig) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ToolError::unexpected(format!("building HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// One-shot startup probe: the mailbox listing must be reachable with
    /// the configured token.
    pub async fn test_connectivity(&self) -> Result<(), ToolError> {
        self.get_json("/api/mailboxes", &[]).await.map(|_| ())
    }

    /// Newest-first message summaries from one mailbox.
    pub async fn list_messages(&self, mailbox: &str, limit: i64) -> Result<ApiOutcome, ToolError> {
        let started = Instant::now();
        let query = [
            ("mailbox", mailbox.to_string()),
            ("limit", limit.to_string()),
        ];
        let body = self.get_json("/api/messages", &query).await?;

        let messages: Vec<Value> = body
            .get("messages")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(map_summary).collect())
            .unwrap_or_default();

        Ok(ApiOutcome {
            data: Value::Array(messages),
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    /// Full headers and body of one message.
    pub async fn get_message(&self, id: &str) -> Result<ApiOutcome, ToolError> {
        let started = Instant::now();
        let body = self
            .get_json(&format!("/api/messages/{}", id), &[])
            .await?;

        Ok(ApiOutcome {
            data: json!({
                "id": body.get("id").cloned().unwrap_or(Value::Null),
                "mailbox": body.get("mailbox").cloned().unwrap_or(Value::Null),
                "from": body.get("from").cloned().unwrap_or(Value::Null),
                "to": body.get("to").cloned().unwrap_or_else(|| json!([])),
                "subject": body.get("subject").cloned().unwrap_or(Value::Null),
                "date": body.get("date").cloned().unwrap_or(Value::Null),
                "body": body.pointer("/body/text").cloned()
                    .or_else(|| body.get("body").cloned())
                    .unwrap_or(Value::Null),
                "attachments": body.get("attachments").cloned().unwrap_or_else(|| json!([])),
            }),
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    /// Full-text search, optionally scoped to one mailbox.
    pub async fn search_messages(
        &self,
        query: &str,
        mailbox: Option<&str>,
        limit: i64,
    ) -> Result<ApiOutcome, ToolError> {
        let started = Instant::now();
        let mut params = vec![
            ("q", query.to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(mailbox) = mailbox {
            params.push(("mailbox", mailbox.to_string()));
        }
        let body = self.get_json("/api/messages/search", &params).await?;

        let messages: Vec<Value> = body
            .get("messages")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(map_summary).collect())
            .unwrap_or_default();

        Ok(ApiOutcome {
            data: Value::Array(messages),
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ToolError> {
        let response = self
            .client
            .get(format!("{}{}", self.config.base_url, path))
            .query(query)
            .bearer_auth(&self.config.token)
            .send()
            .await
            .map_err(classify_transport)?;
        read_body(response).await
    }
}

// ============================================================================
// Wire-shape mapping
// ============================================================================

fn map_summary(raw: &Value) -> Value {
    json!({
        "id": raw.get("id").cloned().unwrap_or(Value::Null),
        "from": raw.get("from").cloned().unwrap_or(Value::Null),
        "subject": raw.get("subject").cloned().unwrap_or(Value::Null),
        "date": raw.get("date").cloned().unwrap_or(Value::Null),
        "seen": raw.get("seen").cloned().unwrap_or(Value::Null),
    })
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
            404 => "message not found".to_string(),
            401 => "authentication failed".to_string(),
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
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(base_url: &str) -> MailAdapter {
        MailAdapter::new(MailConfig {
            base_url: base_url.to_string(),
            token: "test-token".to_string(),
        })
        .expect("client builds")
    }

    #[tokio::test]
    async fn test_list_messages_maps_summaries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/messages"))
            .and(query_param("mailbox", "INBOX"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messages": [
                    { "id": "m1", "from": "a@example.com", "subject": "Hi", "date": "2026-08-01T10:00:00Z", "seen": false, "raw_size": 2048 }
                ]
            })))
            .mount(&server)
            .await;

        let outcome = adapter(&server.uri())
            .list_messages("INBOX", 20)
            .await
            .expect("messages");
        let messages = outcome.data.as_array().unwrap();
        assert_eq!(messages[0]["id"], "m1");
        assert!(messages[0].get("raw_size").is_none());
    }

    #[tokio::test]
    async fn test_get_message_includes_body_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/messages/m42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "m42",
                "mailbox": "INBOX",
                "from": "a@example.com",
                "to": ["b@example.com"],
                "subject": "Quarterly report",
                "date": "2026-08-01T10:00:00Z",
                "body": { "text": "Numbers attached.", "html": "<p>Numbers attached.</p>" },
                "attachments": [{ "filename": "q2.pdf" }]
            })))
            .mount(&server)
            .await;

        let outcome = adapter(&server.uri()).get_message("m42").await.expect("message");
        assert_eq!(outcome.data["body"], "Numbers attached.");
        assert_eq!(outcome.data["attachments"][0]["filename"], "q2.pdf");
    }

    #[tokio::test]
    async fn test_missing_message_is_backend_fault() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/messages/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({})))
            .mount(&server)
            .await;

        let err = adapter(&server.uri()).get_message("gone").await.unwrap_err();
        assert_eq!(err.kind, FaultKind::Backend);
        assert_eq!(err.status, Some(404));
        assert!(err.message.contains("not found"));
    }

    #[tokio::test]
    async fn test_search_scopes_to_mailbox_when_given() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/messages/search"))
            .and(query_param("q", "invoice"))
            .and(query_param("mailbox", "Archive"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messages": [{ "id": "m7", "subject": "Invoice 77" }]
            })))
            .mount(&server)
            .await;

        let outcome = adapter(&server.uri())
            .search_messages("invoice", Some("Archive"), 20)
            .await
            .expect("search");
        assert_eq!(outcome.data.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_store_is_connection_fault() {
        let err = adapter("http://127.0.0.1:9")
            .list_messages("INBOX", 20)
            .await
            .unwrap_err();
        assert_eq!(err.kind, FaultKind::Connection);
        assert_eq!(err.code.as_deref(), Some(gantry_core::CONNECTION_ERROR));
    }
}
