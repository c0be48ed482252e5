//! Tool handlers exposed by the mailbox server.

use crate::adapter::MailAdapter;
use gantry_core::{
    Field, RegistryError, Schema, ToolDescriptor, ToolError, ToolHandler, ToolRegistry,
    ValidatedParams,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Register every tool of this server. Called once during startup.
pub fn register_tools(
    registry: &mut ToolRegistry,
    adapter: Arc<MailAdapter>,
) -> Result<(), RegistryError> {
    registry.register(ListMessagesTool {
        adapter: Arc::clone(&adapter),
    })?;
    registry.register(GetMessageTool {
        adapter: Arc::clone(&adapter),
    })?;
    registry.register(SearchMessagesTool { adapter })?;
    Ok(())
}

// ============================================================================
// listMessages
// ============================================================================

struct ListMessagesTool {
    adapter: Arc<MailAdapter>,
}

#[async_trait::async_trait]
impl ToolHandler for ListMessagesTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "listMessages",
            title: "List messages",
            description: "Newest-first message summaries from one mailbox",
        }
    }

    fn schema(&self) -> Schema {
        Schema::object()
            .field(Field::string("mailbox", "Mailbox to list").default_value("INBOX"))
            .field(Field::integer("limit", "Maximum messages to return").default_value(20).range(1.0, 200.0))
    }

    async fn execute(&self, params: &ValidatedParams) -> Result<Value, ToolError> {
        let mailbox = params["mailbox"].as_str().unwrap_or_default();
        let limit = params["limit"].as_i64().unwrap_or(20);
        let outcome = self
            .adapter
            .list_messages(mailbox, limit)
            .await
            .map_err(|e| e.with_context("mailbox", mailbox.to_string()))?;
        Ok(json!({
            "mailbox": mailbox,
            "messageCount": outcome.data.as_array().map_or(0, Vec::len),
            "executionTime": format!("{}ms", outcome.elapsed_ms),
            "messages": outcome.data,
        }))
    }
}

// ============================================================================
// getMessage
// ============================================================================

struct GetMessageTool {
    adapter: Arc<MailAdapter>,
}

#[async_trait::async_trait]
impl ToolHandler for GetMessageTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "getMessage",
            title: "Get message",
            description: "Full headers, body text and attachment list of one message",
        }
    }

    fn schema(&self) -> Schema {
        Schema::object().field(Field::string("id", "Message id").required().min_len(1))
    }

    async fn execute(&self, params: &ValidatedParams) -> Result<Value, ToolError> {
        let id = params["id"].as_str().unwrap_or_default();
        let outcome = self
            .adapter
            .get_message(id)
            .await
            .map_err(|e| e.with_context("id", id.to_string()))?;
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

// ============================================================================
// searchMessages
// ============================================================================

struct SearchMessagesTool {
    adapter: Arc<MailAdapter>,
}

#[async_trait::async_trait]
impl ToolHandler for SearchMessagesTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "searchMessages",
            title: "Search messages",
            description: "Full-text search over messages, optionally scoped to one mailbox",
        }
    }

    fn schema(&self) -> Schema {
        Schema::object()
            .field(Field::string("query", "Search text").required().min_len(1))
            .field(Field::string("mailbox", "Mailbox to search (all when omitted)"))
            .field(Field::integer("limit", "Maximum matches to return").default_value(20).range(1.0, 200.0))
    }

    async fn execute(&self, params: &ValidatedParams) -> Result<Value, ToolError> {
        let query = params["query"].as_str().unwrap_or_default();
        let mailbox = params.get("mailbox").and_then(Value::as_str);
        let limit = params["limit"].as_i64().unwrap_or(20);
        let outcome = self
            .adapter
            .search_messages(query, mailbox, limit)
            .await
            .map_err(|e| e.with_context("query", query.to_string()))?;
        Ok(json!({
            "query": query,
            "matchCount": outcome.data.as_array().map_or(0, Vec::len),
            "executionTime": format!("{}ms", outcome.elapsed_ms),
            "messages": outcome.data,
        }))
    }
}
