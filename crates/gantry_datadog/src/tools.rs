//! Tool handlers exposed by the Datadog server.

use crate::adapter::DatadogAdapter;
use gantry_core::{
    Field, RegistryError, Schema, ToolDescriptor, ToolError, ToolHandler, ToolRegistry,
    ValidatedParams,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Register every tool of this server. Called once during startup.
pub fn register_tools(
    registry: &mut ToolRegistry,
    adapter: Arc<DatadogAdapter>,
) -> Result<(), RegistryError> {
    registry.register(GetMonitorsTool {
        adapter: Arc::clone(&adapter),
    })?;
    registry.register(SearchLogsTool {
        adapter: Arc::clone(&adapter),
    })?;
    registry.register(GetSpanMetricsTool { adapter })?;
    Ok(())
}

// ============================================================================
// getMonitors
// ============================================================================

struct GetMonitorsTool {
    adapter: Arc<DatadogAdapter>,
}

#[async_trait::async_trait]
impl ToolHandler for GetMonitorsTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "getMonitors",
            title: "Get monitors",
            description: "Fetch monitors and their current status, optionally filtered by group \
                          states and tags",
        }
    }

    fn schema(&self) -> Schema {
        Schema::object()
            .field(Field::string("states", "Comma-separated group states (e.g. alert,warn)"))
            .field(Field::string("tags", "Comma-separated monitor tags to filter by"))
            .field(Field::integer("limit", "Maximum monitors to return").default_value(25).range(1.0, 1000.0))
    }

    async fn execute(&self, params: &ValidatedParams) -> Result<Value, ToolError> {
        let states = params.get("states").and_then(Value::as_str);
        let tags = params.get("tags").and_then(Value::as_str);
        let limit = params["limit"].as_i64().unwrap_or(25);

        let outcome = self
            .adapter
            .get_monitors(states, tags, limit)
            .await
            .map_err(|e| e.with_context("states", states.unwrap_or("all").to_string()))?;
        Ok(json!({
            "monitorCount": outcome.data.as_array().map_or(0, Vec::len),
            "executionTime": format!("{}ms", outcome.elapsed_ms),
            "monitors": outcome.data,
        }))
    }
}

// ============================================================================
// searchLogs
// ============================================================================

struct SearchLogsTool {
    adapter: Arc<DatadogAdapter>,
}

#[async_trait::async_trait]
impl ToolHandler for SearchLogsTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "searchLogs",
            title: "Search logs",
            description: "Search log events with a query over a time range",
        }
    }

    fn schema(&self) -> Schema {
        Schema::object()
            .field(Field::string("query", "Log search query (e.g. service:checkout status:error)").required().min_len(1))
            .field(Field::string("from", "Start of the time range").default_value("now-15m"))
            .field(Field::string("to", "End of the time range").default_value("now"))
            .field(Field::integer("limit", "Maximum events to return").default_value(50).range(1.0, 1000.0))
    }

    async fn execute(&self, params: &ValidatedParams) -> Result<Value, ToolError> {
        let query = params["query"].as_str().unwrap_or_default();
        let from = params["from"].as_str().unwrap_or_default();
        let to = params["to"].as_str().unwrap_or_default();
        let limit = params["limit"].as_i64().unwrap_or(50);

        let outcome = self
            .adapter
            .search_logs(query, from, to, limit)
            .await
            .map_err(|e| e.with_context("query", query.to_string()))?;
        Ok(json!({
            "logCount": outcome.data.as_array().map_or(0, Vec::len),
            "executionTime": format!("{}ms", outcome.elapsed_ms),
            "from": from,
            "to": to,
            "logs": outcome.data,
        }))
    }
}

// ============================================================================
// getSpanMetrics
// ============================================================================

struct GetSpanMetricsTool {
    adapter: Arc<DatadogAdapter>,
}

#[async_trait::async_trait]
impl ToolHandler for GetSpanMetricsTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "getSpanMetrics",
            title: "Get span metrics",
            description: "Request volume, errors and p95 latency for one service over a recent \
                          window",
        }
    }

    fn schema(&self) -> Schema {
        Schema::object()
            .field(Field::string("service", "Service name").required().min_len(1))
            .field(Field::string("env", "Environment scope").default_value("prod"))
            .field(Field::integer("window", "Window in minutes").default_value(15).range(1.0, 1440.0))
    }

    async fn execute(&self, params: &ValidatedParams) -> Result<Value, ToolError> {
        let service = params["service"].as_str().unwrap_or_default();
        let env = params["env"].as_str().unwrap_or_default();
        let window = params["window"].as_i64().unwrap_or(15);

        let outcome = self
            .adapter
            .get_span_metrics(service, env, window)
            .await
            .map_err(|e| e.with_context("service", service.to_string()))?;
        let mut payload = outcome.data;
        if let Some(map) = payload.as_object_mut() {
            map.insert(
                "executionTime".to_string(),
                Value::String(format!("{}ms", outcome.elapsed_ms)),
            );
        }
        Ok(payload)
    }
}
