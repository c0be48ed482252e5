//! Tool registry and dispatcher.
//!
//! The registry maps tool names to (schema, handler) pairs. Dispatch
//! validates input, invokes the handler and normalizes both success and
//! failure into the result envelope. Handler failures never escape as
//! transport faults; the only protocol-level dispatch error is an unknown
//! tool name, which indicates a malformed caller rather than a backend
//! failure.

use crate::error::{DispatchError, RegistryError, ToolError};
use crate::tools::{Envelope, ToolHandler};
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct ToolRegistry {
    tools: IndexMap<String, Arc<dyn ToolHandler>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: IndexMap::new(),
        }
    }

    /// Register a tool handler. Called only during startup.
    ///
    /// Registering two tools under the same name is a programming error and
    /// fails loudly; binaries propagate the error so the process exits
    /// before the transport channel binds.
    pub fn register(&mut self, handler: impl ToolHandler + 'static) -> Result<(), RegistryError> {
        let name = handler.descriptor().name.to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        tracing::debug!("registered tool: {}", name);
        self.tools.insert(name, Arc::new(handler));
        Ok(())
    }

    /// Tool definitions for `tools/list`, in registration order.
    pub fn definitions(&self) -> Vec<Value> {
        self.tools
            .values()
            .map(|handler| {
                let descriptor = handler.descriptor();
                json!({
                    "name": descriptor.name,
                    "title": descriptor.title,
                    "description": descriptor.description,
                    "inputSchema": handler.schema().input_schema(),
                })
            })
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch a tool call.
    ///
    /// Invalid input is reported inside a *normal* envelope whose payload
    /// carries an `error` field — the handler is never invoked, and calling
    /// agents can read and react to the message. Handler failures are
    /// likewise absorbed into the envelope.
    pub async fn dispatch(&self, name: &str, raw: &Value) -> Result<Envelope, DispatchError> {
        let handler = self
            .tools
            .get(name)
            .ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;

        let params = match handler.schema().validate(raw) {
            Ok(params) => params,
            Err(failure) => {
                tracing::debug!("tool '{}' rejected input: {}", name, failure.summary());
                let violations: Vec<Value> = failure
                    .violations
                    .iter()
                    .map(|v| json!({ "field": v.field, "message": v.message }))
                    .collect();
                return Ok(Envelope::text(&json!({
                    "error": format!("Invalid params: {}", failure.summary()),
                    "violations": violations,
                })));
            }
        };

        match handler.execute(&params).await {
            Ok(result) => Ok(Envelope::text(&result)),
            Err(err) => {
                tracing::warn!("tool '{}' failed: {}", name, err);
                Ok(Envelope::from_error(&err))
            }
        }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
