//! Persistent-client adapter for the Datadog HTTP API.
//!
//! Raw API responses never cross the envelope boundary: every operation maps
//! the wire shape into a backend-neutral record before handing it to the
//! dispatcher.

use crate::config::DatadogConfig;
use crate::BACKEND;
use chrono::Utc;
use gantry_core::ToolError;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

pub struct DatadogAdapter {
    client: reqwest::Client,
    config: DatadogConfig,
}

/// Mapped result of one operation plus elapsed wall time.
#[derive(Debug)]
pub struct ApiOutcome {
    pub data: Value,
    pub elapsed_ms: u128,
}

impl DatadogAdapter {
    pub fn new(config: DatadogConfig) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ToolError::unexpected(format!("building HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// One-shot startup probe against the key-validation endpoint.
    pub async fn test_connectivity(&self) -> Result<(), ToolError> {
        let body = self.get_json("/api/v1/validate", &[]).await?;
        if body.get("valid").and_then(Value::as_bool) == Some(true) {
            Ok(())
        } else {
            Err(ToolError::backend(BACKEND, "API key validation failed"))
        }
    }

    /// Fetch monitors, optionally filtered by group states and tags.
    pub async fn get_monitors(
        &self,
        states: Option<&str>,
        tags: Option<&str>,
        limit: i64,
    ) -> Result<ApiOutcome, ToolError> {
        let started = Instant::now();
        let mut query: Vec<(&str, String)> = vec![("page_size", limit.to_string())];
        if let Some(states) = states {
            query.push(("group_states", states.to_string()));
        }
        if let Some(tags) = tags {
            query.push(("monitor_tags", tags.to_string()));
        }

        let body = self.get_json("/api/v1/monitor", &query).await?;
        let monitors: Vec<Value> = body
            .as_array()
            .map(|items| items.iter().map(map_monitor).collect())
            .unwrap_or_default();

        Ok(ApiOutcome {
            data: Value::Array(monitors),
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    /// Search log events within a time range.
    pub async fn search_logs(
        &self,
        query: &str,
        from: &str,
        to: &str,
        limit: i64,
    ) -> Result<ApiOutcome, ToolError> {
        let started = Instant::now();
        let request = json!({
            "filter": { "query": query, "from": from, "to": to },
            "page": { "limit": limit },
            "sort": "-timestamp",
        });

        let body = self.post_json("/api/v2/logs/events/search", &request).await?;
        let logs: Vec<Value> = body
            .get("data")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(map_log_event).collect())
            .unwrap_or_default();

        Ok(ApiOutcome {
            data: Value::Array(logs),
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    /// Span metrics for one service: hits, errors and p95 latency queried
    /// concurrently and merged. One atomic call: if any sub-query fails, the
    /// whole composite fails.
    pub async fn get_span_metrics(
        &self,
        service: &str,
        env: &str,
        window_minutes: i64,
    ) -> Result<ApiOutcome, ToolError> {
        let started = Instant::now();
        let to = Utc::now().timestamp();
        let from = to - window_minutes * 60;
        let scope = format!("{{service:{},env:{}}}", service, env);

        let hits_q = format!("sum:trace.web.request.hits{}.as_count()", scope);
        let errors_q = format!("sum:trace.web.request.errors{}.as_count()", scope);
        let latency_q = format!("p95:trace.web.request.duration{}", scope);

        let (hits, errors, latency) = futures::try_join!(
            self.query_metric(&hits_q, from, to),
            self.query_metric(&errors_q, from, to),
            self.query_metric(&latency_q, from, to),
        )?;

        let error_rate = if hits > 0.0 { errors / hits } else { 0.0 };
        Ok(ApiOutcome {
            data: json!({
                "service": service,
                "env": env,
                "windowMinutes": window_minutes,
                "hits": hits,
                "errors": errors,
                "errorRate": error_rate,
                "latencyP95Seconds": latency,
            }),
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    /// One timeseries query, reduced to the sum of its points.
    async fn query_metric(&self, metric_query: &str, from: i64, to: i64) -> Result<f64, ToolError> {
        let query = [
            ("from", from.to_string()),
            ("to", to.to_string()),
            ("query", metric_query.to_string()),
        ];
        let body = self.get_json("/api/v1/query", &query).await?;

        let total = body
            .get("series")
            .and_then(Value::as_array)
            .map(|series| {
                series
                    .iter()
                    .flat_map(|s| s.get("pointlist").and_then(Value::as_array).cloned().unwrap_or_default())
                    .filter_map(|point| point.get(1).and_then(Value::as_f64))
                    .sum()
            })
            .unwrap_or(0.0);
        Ok(total)
    }

    // ------------------------------------------------------------------
    // HTTP plumbing
    // ------------------------------------------------------------------

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ToolError> {
        let response = self
            .client
            .get(format!("{}{}", self.config.base_url, path))
            .query(query)
            .header("DD-API-KEY", &self.config.api_key)
            .header("DD-APPLICATION-KEY", &self.config.app_key)
            .send()
            .await
            .map_err(classify_transport)?;
        read_body(response).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ToolError> {
        let response = self
            .client
            .post(format!("{}{}", self.config.base_url, path))
            .header("DD-API-KEY", &self.config.api_key)
            .header("DD-APPLICATION-KEY", &self.config.app_key)
            .json(body)
            .send()
            .await
            .map_err(classify_transport)?;
        read_body(response).await
    }
}

// ============================================================================
// Wire-shape mapping
// ============================================================================

fn map_monitor(raw: &Value) -> Value {
    json!({
        "id": raw.get("id").cloned().unwrap_or(Value::Null),
        "name": raw.get("name").cloned().unwrap_or(Value::Null),
        "status": raw.get("overall_state").cloned().unwrap_or(Value::Null),
        "type": raw.get("type").cloned().unwrap_or(Value::Null),
        "query": raw.get("query").cloned().unwrap_or(Value::Null),
        "tags": raw.get("tags").cloned().unwrap_or_else(|| json!([])),
    })
}

fn map_log_event(raw: &Value) -> Value {
    let attributes = raw.get("attributes").cloned().unwrap_or_else(|| json!({}));
    json!({
        "id": raw.get("id").cloned().unwrap_or(Value::Null),
        "timestamp": attributes.get("timestamp").cloned().unwrap_or(Value::Null),
        "status": attributes.get("status").cloned().unwrap_or(Value::Null),
        "service": attributes.get("service").cloned().unwrap_or(Value::Null),
        "message": attributes.get("message").cloned().unwrap_or(Value::Null),
    })
}

// ============================================================================
// Error classification
// ============================================================================

/// A request that never produced a response is a connectivity fault.
pub(crate) fn classify_transport(err: reqwest::Error) -> ToolError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        ToolError::connection(BACKEND, scrub(err))
    } else {
        ToolError::unexpected(scrub(err))
    }
}

/// reqwest errors embed the full URL; drop it so keys in query strings can
/// never leak into a tool response.
fn scrub(err: reqwest::Error) -> String {
    err.without_url().to_string()
}

/// Non-2xx responses are backend faults carrying the platform's own message.
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
        .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()));
    Err(ToolError::backend(BACKEND, message).with_status(status.as_u16()))
}

// ============================================================================
// Tests
// ============================================================================
