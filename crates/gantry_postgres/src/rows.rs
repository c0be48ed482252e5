//! Mapping from dynamically-typed result rows to JSON values.
//!
//! Tool output crosses the envelope boundary as backend-neutral JSON, never
//! as raw driver objects, so every supported column type is mapped
//! explicitly here.

use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo};

/// Convert one row into an object keyed by column name.
pub fn row_to_json(row: &PgRow) -> Value {
    let mut object = Map::new();
    for (index, column) in row.columns().iter().enumerate() {
        object.insert(column.name().to_string(), column_value(row, index));
    }
    Value::Object(object)
}

fn column_value(row: &PgRow, index: usize) -> Value {
    let type_name = row.columns()[index].type_info().name().to_string();
    match type_name.as_str() {
        "BOOL" => opt(row.try_get::<Option<bool>, _>(index)),
        "INT2" => opt(row.try_get::<Option<i16>, _>(index)),
        "INT4" => opt(row.try_get::<Option<i32>, _>(index)),
        "INT8" => opt(row.try_get::<Option<i64>, _>(index)),
        "FLOAT4" => opt(row.try_get::<Option<f32>, _>(index)),
        "FLOAT8" => opt(row.try_get::<Option<f64>, _>(index)),
        "NUMERIC" => row
            .try_get::<Option<sqlx::types::Decimal>, _>(index)
            .map(|v| v.map_or(Value::Null, |d| Value::String(d.to_string())))
            .unwrap_or(Value::Null),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" => {
            opt(row.try_get::<Option<String>, _>(index))
        }
        "UUID" => row
            .try_get::<Option<sqlx::types::Uuid>, _>(index)
            .map(|v| v.map_or(Value::Null, |u| Value::String(u.to_string())))
            .unwrap_or(Value::Null),
        "TIMESTAMPTZ" => row
            .try_get::<Option<sqlx::types::chrono::DateTime<sqlx::types::chrono::Utc>>, _>(index)
            .map(|v| v.map_or(Value::Null, |t| Value::String(t.to_rfc3339())))
            .unwrap_or(Value::Null),
        "TIMESTAMP" => row
            .try_get::<Option<sqlx::types::chrono::NaiveDateTime>, _>(index)
            .map(|v| v.map_or(Value::Null, |t| Value::String(t.to_string())))
            .unwrap_or(Value::Null),
        "DATE" => row
            .try_get::<Option<sqlx::types::chrono::NaiveDate>, _>(index)
            .map(|v| v.map_or(Value::Null, |d| Value::String(d.to_string())))
            .unwrap_or(Value::Null),
        "JSON" | "JSONB" => row
            .try_get::<Option<Value>, _>(index)
            .unwrap_or(None)
            .unwrap_or(Value::Null),
        other => {
            // Fall back to text; columns the driver cannot render as text
            // come through as null rather than failing the whole row.
            match row.try_get::<Option<String>, _>(index) {
                Ok(v) => v.map_or(Value::Null, Value::String),
                Err(_) => {
                    tracing::debug!("unmapped column type '{}' rendered as null", other);
                    Value::Null
                }
            }
        }
    }
}

fn opt<T: Into<Value>>(result: Result<Option<T>, sqlx::Error>) -> Value {
    match result {
        Ok(Some(v)) => v.into(),
        _ => Value::Null,
    }
}
