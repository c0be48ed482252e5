//! Tool handlers exposed by the Vault server.

use crate::adapter::VaultAdapter;
use gantry_core::{
    Field, RegistryError, Schema, ToolDescriptor, ToolError, ToolHandler, ToolRegistry,
    ValidatedParams,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Register every tool of this server. Called once during startup.
pub fn register_tools(
    registry: &mut ToolRegistry,
    adapter: Arc<VaultAdapter>,
) -> Result<(), RegistryError> {
    registry.register(ReadSecretTool {
        adapter: Arc::clone(&adapter),
    })?;
    registry.register(ListSecretsTool {
        adapter: Arc::clone(&adapter),
    })?;
    registry.register(SecretMetadataTool { adapter })?;
    Ok(())
}

// ============================================================================
// readSecret
// ============================================================================

struct ReadSecretTool {
    adapter: Arc<VaultAdapter>,
}

#[async_trait::async_trait]
impl ToolHandler for ReadSecretTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "readSecret",
            title: "Read secret",
            description: "Read one secret's key/value data and version metadata",
        }
    }

    fn schema(&self) -> Schema {
        Schema::object()
            .field(Field::string("path", "Secret path below the mount, e.g. app/db").required().min_len(1))
            .field(Field::integer("version", "Specific version to read (latest when omitted)").range(1.0, 1_000_000.0))
    }

    async fn execute(&self, params: &ValidatedParams) -> Result<Value, ToolError> {
        let path = params["path"].as_str().unwrap_or_default();
        let version = params.get("version").and_then(Value::as_i64);

        let outcome = self
            .adapter
            .read_secret(path, version)
            .await
            .map_err(|e| e.with_context("path", path.to_string()))?;
        let mut payload = json!({ "path": path });
        if let (Some(map), Some(fields)) = (payload.as_object_mut(), outcome.data.as_object()) {
            for (key, value) in fields {
                map.insert(key.clone(), value.clone());
            }
            map.insert(
                "executionTime".to_string(),
                Value::String(format!("{}ms", outcome.elapsed_ms)),
            );
        }
        Ok(payload)
    }
}

// ============================================================================
// listSecrets
// ============================================================================

struct ListSecretsTool {
    adapter: Arc<VaultAdapter>,
}

#[async_trait::async_trait]
impl ToolHandler for ListSecretsTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "listSecrets",
            title: "List secrets",
            description: "List the child keys under a path prefix",
        }
    }

    fn schema(&self) -> Schema {
        Schema::object()
            .field(Field::string("path", "Path prefix to list (mount root when empty)").default_value(""))
    }

    async fn execute(&self, params: &ValidatedParams) -> Result<Value, ToolError> {
        let path = params["path"].as_str().unwrap_or_default();
        let outcome = self
            .adapter
            .list_secrets(path)
            .await
            .map_err(|e| e.with_context("path", path.to_string()))?;
        Ok(json!({
            "path": path,
            "keyCount": outcome.data.as_array().map_or(0, Vec::len),
            "executionTime": format!("{}ms", outcome.elapsed_ms),
            "keys": outcome.data,
        }))
    }
}

// ============================================================================
// secretMetadata
// ============================================================================

struct SecretMetadataTool {
    adapter: Arc<VaultAdapter>,
}

#[async_trait::async_trait]
impl ToolHandler for SecretMetadataTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "secretMetadata",
            title: "Secret metadata",
            description: "Version history and timestamps for one secret, without its values",
        }
    }

    fn schema(&self) -> Schema {
        Schema::object()
            .field(Field::string("path", "Secret path below the mount").required().min_len(1))
    }

    async fn execute(&self, params: &ValidatedParams) -> Result<Value, ToolError> {
        let path = params["path"].as_str().unwrap_or_default();
        let outcome = self
            .adapter
            .secret_metadata(path)
            .await
            .map_err(|e| e.with_context("path", path.to_string()))?;
        let mut payload = json!({ "path": path });
        if let (Some(map), Some(fields)) = (payload.as_object_mut(), outcome.data.as_object()) {
            for (key, value) in fields {
                map.insert(key.clone(), value.clone());
            }
            map.insert(
                "executionTime".to_string(),
                Value::String(format!("{}ms", outcome.elapsed_ms)),
            );
        }
        Ok(payload)
    }
}
