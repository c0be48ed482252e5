//! Error classification for tool execution.
//!
//! Every failing tool call ends up as a [`ToolError`] before it reaches the
//! dispatcher, which serializes it into the result envelope. The caller never
//! sees a transport-level fault for a domain failure.

use serde_json::{Map, Value};
use std::fmt;

// ============================================================================
// Fault taxonomy
// ============================================================================

/// How a tool call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The backend rejected or failed the call (not-found, access-denied,
    /// syntax error, rate limit).
    Backend,
    /// The request violated a hard safety invariant (e.g. a write statement
    /// submitted to a read-only adapter).
    Policy,
    /// The backend could not be reached at all (DNS, TCP, TLS, auth
    /// handshake).
    Connection,
    /// Anything not recognized as one of the above.
    Unexpected,
}

/// Machine code attached to connection faults.
pub const CONNECTION_ERROR: &str = "CONNECTION_ERROR";

// ============================================================================
// ToolError
// ============================================================================

/// A classified tool-call failure.
///
/// Carries the backend-identifying tag used as the message prefix, the
/// backend's own error code when it reported one, and request-context pairs
/// (query text, table name, secret path, ...) that are echoed into the error
/// payload so the caller can correlate cause and effect. Must never carry
/// credentials or connection strings.
#[derive(Debug, Clone)]
pub struct ToolError {
    pub kind: FaultKind,
    backend: Option<&'static str>,
    pub message: String,
    pub code: Option<String>,
    pub status: Option<u16>,
    context: Vec<(&'static str, Value)>,
}

impl ToolError {
    /// A fault reported by the backend itself.
    pub fn backend(tag: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Backend,
            backend: Some(tag),
            message: message.into(),
            code: None,
            status: None,
            context: Vec::new(),
        }
    }

    /// A hard safety-invariant violation, rejected before any network call.
    pub fn policy(tag: &'static str, code: &str, message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Policy,
            backend: Some(tag),
            message: message.into(),
            code: Some(code.to_string()),
            status: None,
            context: Vec::new(),
        }
    }

    /// The backend was unreachable.
    pub fn connection(tag: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Connection,
            backend: Some(tag),
            message: message.into(),
            code: Some(CONNECTION_ERROR.to_string()),
            status: None,
            context: Vec::new(),
        }
    }

    /// An unanticipated failure (programming error, unknown exception type).
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Unexpected,
            backend: None,
            message: message.into(),
            code: None,
            status: None,
            context: Vec::new(),
        }
    }

    /// Attach the backend's own error code (e.g. `42P01`).
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach the HTTP status the backend answered with.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach a request-identifying field echoed into the error payload.
    pub fn with_context(mut self, key: &'static str, value: impl Into<Value>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// The payload serialized into the envelope's text item.
    pub fn payload(&self) -> Value {
        let mut map = Map::new();
        map.insert("error".to_string(), Value::String(self.to_string()));
        if let Some(code) = &self.code {
            map.insert("code".to_string(), Value::String(code.clone()));
        }
        if let Some(status) = self.status {
            map.insert("statusCode".to_string(), Value::from(status));
        }
        for (key, value) in &self.context {
            map.insert((*key).to_string(), value.clone());
        }
        Value::Object(map)
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.backend) {
            (FaultKind::Unexpected, _) | (_, None) => {
                write!(f, "Unexpected error: {}", self.message)
            }
            (_, Some(tag)) => write!(f, "{} Error: {}", tag, self.message),
        }
    }
}

impl std::error::Error for ToolError {}

// ============================================================================
// Registry / dispatch errors
// ============================================================================

/// Startup-time registration failure. Propagated out of `main` so the
/// process exits non-zero before the transport channel binds.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),
}

/// Protocol-level dispatch failure. Unlike handler failures, this indicates
/// a malformed caller and is surfaced as a JSON-RPC error by the transport.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display_has_tag() {
        let err = ToolError::backend("PostgreSQL", "relation \"users\" does not exist");
        assert_eq!(
            err.to_string(),
            "PostgreSQL Error: relation \"users\" does not exist"
        );
    }

    #[test]
    fn test_unexpected_error_display() {
        let err = ToolError::unexpected("something odd");
        assert_eq!(err.to_string(), "Unexpected error: something odd");
    }

    #[test]
    fn test_payload_carries_code_and_context() {
        let err = ToolError::backend("PostgreSQL", "no such table")
            .with_code("42P01")
            .with_context("tableName", "missing");
        let payload = err.payload();
        assert_eq!(payload["code"], "42P01");
        assert_eq!(payload["tableName"], "missing");
        assert!(payload["error"].as_str().unwrap().contains("PostgreSQL Error:"));
    }

    #[test]
    fn test_connection_error_gets_generic_code() {
        let err = ToolError::connection("Vault", "dns failure");
        assert_eq!(err.code.as_deref(), Some(CONNECTION_ERROR));
        assert_eq!(err.kind, FaultKind::Connection);
    }

    #[test]
    fn test_policy_error_tagged_like_backend() {
        let err = ToolError::policy(
            "PostgreSQL",
            "WRITE_OPERATION_NOT_ALLOWED",
            "only read-only queries are allowed",
        );
        assert!(err.to_string().starts_with("PostgreSQL Error:"));
        assert_eq!(err.payload()["code"], "WRITE_OPERATION_NOT_ALLOWED");
    }
}
