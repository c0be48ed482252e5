//! Tool handlers exposed by the npm registry server.

use crate::adapter::NpmAdapter;
use gantry_core::{
    Field, RegistryError, Schema, ToolDescriptor, ToolError, ToolHandler, ToolRegistry,
    ValidatedParams,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Register every tool of this server. Called once during startup.
pub fn register_tools(
    registry: &mut ToolRegistry,
    adapter: Arc<NpmAdapter>,
) -> Result<(), RegistryError> {
    registry.register(PackageInfoTool {
        adapter: Arc::clone(&adapter),
    })?;
    registry.register(SearchPackagesTool {
        adapter: Arc::clone(&adapter),
    })?;
    registry.register(DownloadCountsTool { adapter })?;
    Ok(())
}

// ============================================================================
// packageInfo
// ============================================================================

struct PackageInfoTool {
    adapter: Arc<NpmAdapter>,
}

#[async_trait::async_trait]
impl ToolHandler for PackageInfoTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "packageInfo",
            title: "Package info",
            description: "Latest version, description, license and dependencies of a package",
        }
    }

    fn schema(&self) -> Schema {
        Schema::object().field(
            Field::string("name", "Package name, scoped names included (e.g. @types/node)")
                .required()
                .min_len(1)
                .max_len(214),
        )
    }

    async fn execute(&self, params: &ValidatedParams) -> Result<Value, ToolError> {
        let name = params["name"].as_str().unwrap_or_default();
        let outcome = self
            .adapter
            .package_info(name)
            .await
            .map_err(|e| e.with_context("packageName", name.to_string()))?;
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
// searchPackages
// ============================================================================

struct SearchPackagesTool {
    adapter: Arc<NpmAdapter>,
}

#[async_trait::async_trait]
impl ToolHandler for SearchPackagesTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "searchPackages",
            title: "Search packages",
            description: "Full-text search over the registry",
        }
    }

    fn schema(&self) -> Schema {
        Schema::object()
            .field(Field::string("query", "Search text").required().min_len(1))
            .field(Field::integer("limit", "Maximum results").default_value(10).range(1.0, 250.0))
    }

    async fn execute(&self, params: &ValidatedParams) -> Result<Value, ToolError> {
        let query = params["query"].as_str().unwrap_or_default();
        let limit = params["limit"].as_i64().unwrap_or(10);
        let outcome = self
            .adapter
            .search_packages(query, limit)
            .await
            .map_err(|e| e.with_context("query", query.to_string()))?;
        Ok(json!({
            "query": query,
            "resultCount": outcome.data.as_array().map_or(0, Vec::len),
            "executionTime": format!("{}ms", outcome.elapsed_ms),
            "results": outcome.data,
        }))
    }
}

// ============================================================================
// downloadCounts
// ============================================================================

struct DownloadCountsTool {
    adapter: Arc<NpmAdapter>,
}

#[async_trait::async_trait]
impl ToolHandler for DownloadCountsTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "downloadCounts",
            title: "Download counts",
            description: "Download count for a package over a named period \
                          (last-day, last-week, last-month)",
        }
    }

    fn schema(&self) -> Schema {
        Schema::object()
            .field(Field::string("name", "Package name").required().min_len(1))
            .field(Field::string("period", "Period to count over").default_value("last-week"))
    }

    async fn execute(&self, params: &ValidatedParams) -> Result<Value, ToolError> {
        let name = params["name"].as_str().unwrap_or_default();
        let period = params["period"].as_str().unwrap_or_default();
        let outcome = self
            .adapter
            .download_counts(name, period)
            .await
            .map_err(|e| e.with_context("packageName", name.to_string()))?;
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
