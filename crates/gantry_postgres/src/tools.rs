//! Tool handlers exposed by the PostgreSQL server.

use crate::adapter::PgAdapter;
use gantry_core::{
    Field, RegistryError, Schema, ToolDescriptor, ToolError, ToolHandler, ToolRegistry,
    ValidatedParams,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Register every tool of this server. Called once during startup.
pub fn register_tools(
    registry: &mut ToolRegistry,
    adapter: Arc<PgAdapter>,
) -> Result<(), RegistryError> {
    registry.register(QueryTool {
        adapter: Arc::clone(&adapter),
    })?;
    registry.register(ListTablesTool {
        adapter: Arc::clone(&adapter),
    })?;
    registry.register(DescribeTableTool { adapter })?;
    Ok(())
}

// ============================================================================
// query
// ============================================================================

struct QueryTool {
    adapter: Arc<PgAdapter>,
}

#[async_trait::async_trait]
impl ToolHandler for QueryTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "query",
            title: "Run read-only query",
            description: "Run a read-only SQL query (SELECT, SHOW, EXPLAIN, DESCRIBE, WITH ... AS) \
                          and return the matching rows",
        }
    }

    fn schema(&self) -> Schema {
        Schema::object().field(
            Field::string("sql", "The SQL statement to execute. Write statements are rejected.")
                .required()
                .min_len(1),
        )
    }

    async fn execute(&self, params: &ValidatedParams) -> Result<Value, ToolError> {
        let sql = params["sql"].as_str().unwrap_or_default();
        let outcome = self
            .adapter
            .run_query(sql)
            .await
            .map_err(|e| e.with_context("query", sql.to_string()))?;
        Ok(query_payload(&outcome.rows, outcome.elapsed_ms))
    }
}

/// Success payload for `query`: row count, timing and the data itself.
pub fn query_payload(rows: &[Value], elapsed_ms: u128) -> Value {
    json!({
        "rowCount": rows.len(),
        "executionTime": format!("{}ms", elapsed_ms),
        "data": rows,
    })
}

// ============================================================================
// listTables
// ============================================================================

struct ListTablesTool {
    adapter: Arc<PgAdapter>,
}

#[async_trait::async_trait]
impl ToolHandler for ListTablesTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "listTables",
            title: "List tables",
            description: "List the tables in a schema",
        }
    }

    fn schema(&self) -> Schema {
        Schema::object().field(
            Field::string("schema", "Schema to list tables from").default_value("public"),
        )
    }

    async fn execute(&self, params: &ValidatedParams) -> Result<Value, ToolError> {
        let schema = params["schema"].as_str().unwrap_or_default();
        let outcome = self
            .adapter
            .list_tables(schema)
            .await
            .map_err(|e| e.with_context("schema", schema.to_string()))?;
        Ok(json!({
            "schema": schema,
            "tableCount": outcome.rows.len(),
            "executionTime": format!("{}ms", outcome.elapsed_ms),
            "tables": outcome.rows,
        }))
    }
}

// ============================================================================
// describeTable
// ============================================================================

struct DescribeTableTool {
    adapter: Arc<PgAdapter>,
}

#[async_trait::async_trait]
impl ToolHandler for DescribeTableTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "describeTable",
            title: "Describe table",
            description: "Describe a table's columns, defaults and primary key",
        }
    }

    fn schema(&self) -> Schema {
        Schema::object()
            .field(Field::string("tableName", "Table to describe").required().min_len(1))
            .field(Field::string("schema", "Schema the table lives in").default_value("public"))
    }

    async fn execute(&self, params: &ValidatedParams) -> Result<Value, ToolError> {
        let table = params["tableName"].as_str().unwrap_or_default();
        let schema = params["schema"].as_str().unwrap_or_default();
        let description = self
            .adapter
            .describe_table(schema, table)
            .await
            .map_err(|e| e.with_context("tableName", table.to_string()))?;
        Ok(json!({
            "schema": schema,
            "tableName": table,
            "executionTime": format!("{}ms", description.elapsed_ms),
            "columns": description.columns,
            "primaryKeys": description.primary_keys,
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_payload_shape() {
        let rows = vec![json!({ "id": 1 }), json!({ "id": 2 })];
        let payload = query_payload(&rows, 15);
        assert_eq!(payload["rowCount"], 2);
        assert_eq!(payload["executionTime"], "15ms");
        assert_eq!(payload["data"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_query_schema_requires_sql() {
        let schema = Schema::object().field(Field::string("sql", "").required().min_len(1));
        assert!(schema.validate(&json!({})).is_err());
        assert!(schema.validate(&json!({ "sql": "SELECT 1" })).is_ok());
    }
}
