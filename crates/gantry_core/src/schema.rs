//! Declarative input schemas and validation.
//!
//! A [`Schema`] is pure data: an ordered list of named fields with a
//! primitive kind, an optional default, optional bounds and a required flag.
//! It validates and coerces a loosely-typed JSON object into the map a
//! handler receives, and renders itself into the JSON-Schema-shaped
//! `inputSchema` advertised by `tools/list`.
//!
//! Validation collects *every* violated field in one pass rather than
//! failing fast; all Gantry servers report violations the same way.

use serde_json::{json, Map, Value};
use std::fmt;

// ============================================================================
// Field kinds
// ============================================================================

/// Primitive kind of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    StringArray,
    Object,
}

impl FieldKind {
    fn json_type(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::StringArray => "array",
            FieldKind::Object => "object",
        }
    }
}

// ============================================================================
// Field
// ============================================================================

/// One declared field of a schema.
#[derive(Debug, Clone)]
pub struct Field {
    name: &'static str,
    kind: FieldKind,
    description: &'static str,
    required: bool,
    default: Option<Value>,
    min_len: Option<usize>,
    max_len: Option<usize>,
    min: Option<f64>,
    max: Option<f64>,
    max_items: Option<usize>,
}

impl Field {
    fn new(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: false,
            default: None,
            min_len: None,
            max_len: None,
            min: None,
            max: None,
            max_items: None,
        }
    }

    pub fn string(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldKind::String, description)
    }

    pub fn integer(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldKind::Integer, description)
    }

    pub fn number(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldKind::Number, description)
    }

    pub fn boolean(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldKind::Boolean, description)
    }

    pub fn string_array(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldKind::StringArray, description)
    }

    pub fn object(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldKind::Object, description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Default substituted when the field is absent.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn min_len(mut self, n: usize) -> Self {
        self.min_len = Some(n);
        self
    }

    pub fn max_len(mut self, n: usize) -> Self {
        self.max_len = Some(n);
        self
    }

    /// Inclusive numeric range.
    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn max_items(mut self, n: usize) -> Self {
        self.max_items = Some(n);
        self
    }

    /// Kind-preserving coercion: numeric strings become numbers, the strings
    /// "true"/"false" become booleans. Anything else must already match.
    fn coerce(&self, value: &Value) -> Result<Value, String> {
        match self.kind {
            FieldKind::String => match value {
                Value::String(_) => Ok(value.clone()),
                _ => Err("expected a string".to_string()),
            },
            FieldKind::Integer => match value {
                Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
                Value::Number(n) => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 => Ok(json!(f as i64)),
                    _ => Err("expected an integer".to_string()),
                },
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| format!("'{}' is not an integer", s)),
                _ => Err("expected an integer".to_string()),
            },
            FieldKind::Number => match value {
                Value::Number(_) => Ok(value.clone()),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::from)
                    .map_err(|_| format!("'{}' is not a number", s)),
                _ => Err("expected a number".to_string()),
            },
            FieldKind::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                Value::String(s) => match s.as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    _ => Err(format!("'{}' is not a boolean", s)),
                },
                _ => Err("expected a boolean".to_string()),
            },
            FieldKind::StringArray => match value {
                Value::Array(items) => {
                    if items.iter().all(Value::is_string) {
                        Ok(value.clone())
                    } else {
                        Err("expected an array of strings".to_string())
                    }
                }
                _ => Err("expected an array of strings".to_string()),
            },
            FieldKind::Object => match value {
                Value::Object(_) => Ok(value.clone()),
                _ => Err("expected an object".to_string()),
            },
        }
    }

    /// Bounds check over the already-coerced value.
    fn check_bounds(&self, value: &Value) -> Result<(), String> {
        if let Value::String(s) = value {
            let len = s.chars().count();
            if let Some(min) = self.min_len {
                if len < min {
                    return Err(format!("must be at least {} characters", min));
                }
            }
            if let Some(max) = self.max_len {
                if len > max {
                    return Err(format!("must be at most {} characters", max));
                }
            }
        }
        if let Some(n) = value.as_f64() {
            if let Some(min) = self.min {
                if n < min {
                    return Err(format!("must be >= {}", min));
                }
            }
            if let Some(max) = self.max {
                if n > max {
                    return Err(format!("must be <= {}", max));
                }
            }
        }
        if let Value::Array(items) = value {
            if let Some(max) = self.max_items {
                if items.len() > max {
                    return Err(format!("must have at most {} items", max));
                }
            }
        }
        Ok(())
    }

    fn property_schema(&self) -> Value {
        let mut prop = Map::new();
        prop.insert("type".to_string(), Value::String(self.kind.json_type().to_string()));
        if !self.description.is_empty() {
            prop.insert("description".to_string(), Value::String(self.description.to_string()));
        }
        if self.kind == FieldKind::StringArray {
            prop.insert("items".to_string(), json!({ "type": "string" }));
        }
        if let Some(default) = &self.default {
            prop.insert("default".to_string(), default.clone());
        }
        if let Some(n) = self.min_len {
            prop.insert("minLength".to_string(), Value::from(n));
        }
        if let Some(n) = self.max_len {
            prop.insert("maxLength".to_string(), Value::from(n));
        }
        if let Some(n) = self.min {
            prop.insert("minimum".to_string(), Value::from(n));
        }
        if let Some(n) = self.max {
            prop.insert("maximum".to_string(), Value::from(n));
        }
        if let Some(n) = self.max_items {
            prop.insert("maxItems".to_string(), Value::from(n));
        }
        Value::Object(prop)
    }
}

// ============================================================================
// Schema
// ============================================================================

/// An ordered collection of fields describing a tool's input.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

/// The schema-conformant parameter map handed to a handler.
pub type ValidatedParams = Map<String, Value>;

impl Schema {
    pub fn object() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Append a reusable fragment (e.g. pagination fields).
    pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Validate and coerce a raw input value.
    ///
    /// Pure function. Collects every violated field in one pass. Unknown
    /// input fields are carried through untouched so callers can send
    /// forward-compatible extensions.
    pub fn validate(&self, raw: &Value) -> Result<ValidatedParams, ValidationFailure> {
        let input = match raw {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            _ => {
                return Err(ValidationFailure {
                    violations: vec![Violation {
                        field: "params".to_string(),
                        message: "parameters must be an object".to_string(),
                    }],
                })
            }
        };

        let mut params = input.clone();
        let mut violations = Vec::new();

        for field in &self.fields {
            match input.get(field.name) {
                None | Some(Value::Null) => {
                    if let Some(default) = &field.default {
                        params.insert(field.name.to_string(), default.clone());
                    } else if field.required {
                        violations.push(Violation {
                            field: field.name.to_string(),
                            message: "required field is missing".to_string(),
                        });
                    }
                }
                Some(value) => match field.coerce(value) {
                    Ok(coerced) => {
                        if let Err(message) = field.check_bounds(&coerced) {
                            violations.push(Violation {
                                field: field.name.to_string(),
                                message,
                            });
                        } else {
                            params.insert(field.name.to_string(), coerced);
                        }
                    }
                    Err(message) => violations.push(Violation {
                        field: field.name.to_string(),
                        message,
                    }),
                },
            }
        }

        if violations.is_empty() {
            Ok(params)
        } else {
            Err(ValidationFailure { violations })
        }
    }

    /// JSON-Schema-shaped value advertised by `tools/list`.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &self.fields {
            properties.insert(field.name.to_string(), field.property_schema());
            if field.required {
                required.push(Value::String(field.name.to_string()));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

// ============================================================================
// Validation failure
// ============================================================================

/// One violated field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

/// All violations found in a single validation pass.
#[derive(Debug, Clone)]
pub struct ValidationFailure {
    pub violations: Vec<Violation>,
}

impl ValidationFailure {
    pub fn summary(&self) -> String {
        self.violations
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid params: {}", self.summary())
    }
}

impl std::error::Error for ValidationFailure {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn paging_fields() -> Vec<Field> {
        vec![
            Field::integer("page", "page number").default_value(1).range(1.0, 10_000.0),
            Field::integer("limit", "page size").default_value(50).range(1.0, 500.0),
        ]
    }

    fn query_schema() -> Schema {
        Schema::object()
            .field(Field::string("sql", "statement to run").required().min_len(1))
            .fields(paging_fields())
    }

    #[test]
    fn test_defaults_substituted_when_absent() {
        let params = query_schema()
            .validate(&json!({ "sql": "SELECT 1" }))
            .expect("valid");
        assert_eq!(params["page"], 1);
        assert_eq!(params["limit"], 50);
    }

    #[test]
    fn test_missing_required_field_fails() {
        let err = query_schema().validate(&json!({})).unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert_eq!(err.violations[0].field, "sql");
    }

    #[test]
    fn test_all_violations_collected_in_one_pass() {
        let schema = Schema::object()
            .field(Field::string("a", "").required())
            .field(Field::integer("b", "").required())
            .field(Field::string("c", "").min_len(3));
        let err = schema.validate(&json!({ "c": "x" })).unwrap_err();
        let fields: Vec<_> = err.violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_numeric_string_coerced_to_integer() {
        let schema = Schema::object().field(Field::integer("limit", ""));
        let params = schema.validate(&json!({ "limit": "25" })).expect("valid");
        assert_eq!(params["limit"], 25);
    }

    #[test]
    fn test_boolean_string_coerced() {
        let schema = Schema::object().field(Field::boolean("pretty", ""));
        let params = schema.validate(&json!({ "pretty": "true" })).expect("valid");
        assert_eq!(params["pretty"], true);
    }

    #[test]
    fn test_range_violation_reports_field() {
        let schema = Schema::object().field(Field::integer("limit", "").range(1.0, 500.0));
        let err = schema.validate(&json!({ "limit": 9999 })).unwrap_err();
        assert_eq!(err.violations[0].field, "limit");
        assert!(err.violations[0].message.contains("<= 500"));
    }

    #[test]
    fn test_unknown_fields_carried_through() {
        let schema = Schema::object().field(Field::string("sql", "").required());
        let params = schema
            .validate(&json!({ "sql": "SELECT 1", "futureFlag": true }))
            .expect("valid");
        assert_eq!(params["futureFlag"], true);
    }

    #[test]
    fn test_non_object_params_rejected() {
        let err = query_schema().validate(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.violations[0].field, "params");
    }

    #[test]
    fn test_null_treated_as_empty_object() {
        let schema = Schema::object().field(Field::integer("limit", "").default_value(10));
        let params = schema.validate(&Value::Null).expect("valid");
        assert_eq!(params["limit"], 10);
    }

    #[test]
    fn test_input_schema_shape() {
        let schema = query_schema().input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["sql"]["type"], "string");
        assert_eq!(schema["properties"]["sql"]["minLength"], 1);
        assert_eq!(schema["properties"]["limit"]["default"], 50);
        assert_eq!(schema["required"], json!(["sql"]));
    }

    #[test]
    fn test_string_array_items_must_be_strings() {
        let schema = Schema::object().field(Field::string_array("tags", ""));
        assert!(schema.validate(&json!({ "tags": ["a", "b"] })).is_ok());
        assert!(schema.validate(&json!({ "tags": ["a", 1] })).is_err());
    }
}
