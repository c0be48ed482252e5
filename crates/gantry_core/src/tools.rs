//! Tool abstraction types — shared by every Gantry server.

use crate::error::ToolError;
use crate::schema::{Schema, ValidatedParams};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity of a registered tool. Immutable after registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

/// One item of a result envelope. The wire discriminator is `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub item_type: String,
    pub text: String,
}

/// The one universal output shape every tool call returns, win or fail.
///
/// There is deliberately no distinct error transport type: failures are
/// serialized into the same envelope as a JSON payload carrying an `error`
/// field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub content: Vec<ContentItem>,
}

impl Envelope {
    /// Wrap a domain result as pretty-printed JSON text (2-space indent,
    /// stable key order).
    pub fn text(payload: &Value) -> Self {
        let text = serde_json::to_string_pretty(payload)
            .unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {}\"}}", e));
        Self {
            content: vec![ContentItem {
                item_type: "text".to_string(),
                text,
            }],
        }
    }

    /// Wrap a classified failure. Same shape as success.
    pub fn from_error(err: &ToolError) -> Self {
        Self::text(&err.payload())
    }

    /// Parse the first text item back into JSON. Test and caller convenience.
    pub fn payload(&self) -> Option<Value> {
        let item = self.content.first()?;
        serde_json::from_str(&item.text).ok()
    }
}

/// Trait every tool handler implements.
///
/// The dispatcher validates input against `schema()` before `execute` runs,
/// so handlers can index into the map for declared fields without
/// re-checking presence of required ones.
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync {
    /// Identity used for dispatch and `tools/list`.
    fn descriptor(&self) -> ToolDescriptor;

    /// Declared input shape. Every field the handler reads must appear here
    /// with a compatible kind.
    fn schema(&self) -> Schema;

    /// Perform the backend call.
    async fn execute(&self, params: &ValidatedParams) -> Result<Value, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_serializes_with_type_field() {
        let env = Envelope::text(&json!({ "ok": true }));
        let wire = serde_json::to_value(&env).expect("serializable");
        assert_eq!(wire["content"][0]["type"], "text");
        assert!(wire["content"][0]["text"].as_str().unwrap().contains("\"ok\": true"));
    }

    #[test]
    fn test_envelope_text_is_two_space_indented() {
        let env = Envelope::text(&json!({ "a": 1 }));
        assert_eq!(env.content[0].text, "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_error_envelope_same_shape_as_success() {
        let err = ToolError::backend("Datadog", "rate limited").with_status(429);
        let env = Envelope::from_error(&err);
        assert_eq!(env.content.len(), 1);
        assert_eq!(env.content[0].item_type, "text");
        let payload = env.payload().expect("json payload");
        assert_eq!(payload["statusCode"], 429);
        assert!(payload["error"].as_str().unwrap().starts_with("Datadog Error:"));
    }
}
