//! Property tests for the schema validator and dispatcher envelope.

use gantry_core::{Field, Schema};
use proptest::prelude::*;
use serde_json::json;

fn limit_schema() -> Schema {
    Schema::object()
        .field(Field::string("query", "search text").required().min_len(1).max_len(1024))
        .field(Field::integer("limit", "max results").default_value(50).range(1.0, 500.0))
}

proptest! {
    // Valid inputs validate to themselves with defaults applied.
    #[test]
    fn prop_valid_input_roundtrips(query in "[a-zA-Z0-9 ]{1,64}", limit in 1i64..=500) {
        let params = limit_schema()
            .validate(&json!({ "query": query, "limit": limit }))
            .expect("input inside bounds must validate");
        prop_assert_eq!(params["query"].as_str().unwrap(), query.as_str());
        prop_assert_eq!(params["limit"].as_i64().unwrap(), limit);
    }

    // Defaults are applied exactly when the field is absent.
    #[test]
    fn prop_default_applied_when_absent(query in "[a-zA-Z0-9]{1,32}") {
        let params = limit_schema()
            .validate(&json!({ "query": query }))
            .expect("valid");
        prop_assert_eq!(params["limit"].as_i64().unwrap(), 50);
    }

    // Numeric strings coerce to the same value as the raw number.
    #[test]
    fn prop_numeric_string_coercion_matches(limit in 1i64..=500) {
        let as_number = limit_schema()
            .validate(&json!({ "query": "q", "limit": limit }))
            .expect("valid");
        let as_string = limit_schema()
            .validate(&json!({ "query": "q", "limit": limit.to_string() }))
            .expect("valid");
        prop_assert_eq!(&as_number["limit"], &as_string["limit"]);
    }

    // Out-of-range limits always fail, and the failure names the field.
    #[test]
    fn prop_out_of_range_rejected(limit in 501i64..100_000) {
        let err = limit_schema()
            .validate(&json!({ "query": "q", "limit": limit }))
            .unwrap_err();
        prop_assert!(err.violations.iter().any(|v| v.field == "limit"));
    }

    // Missing required fields always fail; unknown extras never do.
    #[test]
    fn prop_missing_required_rejected(extra in "[a-z]{1,16}") {
        let err = limit_schema()
            .validate(&json!({ "unrelated": extra }))
            .unwrap_err();
        prop_assert!(err.violations.iter().any(|v| v.field == "query"));
    }
}
