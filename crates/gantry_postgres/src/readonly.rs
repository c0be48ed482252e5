//! Read-only statement guard.
//!
//! An allow-list of permitted statement openers, matched case-insensitively
//! against the start of the statement. Anything that does not match is
//! rejected before any connection is opened. The list is intentionally
//! coarse: extend it only by adding new exact prefixes, never by relaxing
//! the default-deny.

use crate::BACKEND;
use gantry_core::ToolError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Machine code attached to rejected statements.
pub const WRITE_OPERATION_NOT_ALLOWED: &str = "WRITE_OPERATION_NOT_ALLOWED";

/// Permitted statement openers, matched as whole leading keywords.
const ALLOWED_PREFIXES: &[&str] = &["select", "show", "explain", "describe", "desc"];

/// Common-table-expression opener: `with <ident> as (`.
static CTE_OPENER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^with\s+"?[a-z_][a-z0-9_]*"?\s+as\s*\("#).expect("valid CTE regex")
});

/// Reject any statement that does not start with an allow-listed opener.
///
/// Enforced unconditionally, regardless of caller identity, before any
/// network call is attempted.
pub fn check_read_only(sql: &str) -> Result<(), ToolError> {
    let statement = sql.trim_start();
    let lowered = statement.to_lowercase();

    let first_keyword_allowed = ALLOWED_PREFIXES.iter().any(|prefix| {
        lowered.starts_with(prefix)
            && lowered[prefix.len()..]
                .chars()
                .next()
                .map_or(true, |c| c.is_whitespace() || c == '(' || c == ';')
    });

    if first_keyword_allowed || CTE_OPENER.is_match(statement) {
        return Ok(());
    }

    Err(ToolError::policy(
        BACKEND,
        WRITE_OPERATION_NOT_ALLOWED,
        "write operations are not permitted; only read-only queries are allowed \
         (SELECT, SHOW, EXPLAIN, DESCRIBE, WITH ... AS)",
    ))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::FaultKind;

    #[test]
    fn test_select_allowed() {
        assert!(check_read_only("SELECT * FROM users").is_ok());
        assert!(check_read_only("  select 1").is_ok());
        assert!(check_read_only("SELECT(1)").is_ok());
    }

    #[test]
    fn test_show_explain_describe_allowed() {
        assert!(check_read_only("SHOW server_version").is_ok());
        assert!(check_read_only("EXPLAIN SELECT 1").is_ok());
        assert!(check_read_only("DESCRIBE users").is_ok());
        assert!(check_read_only("desc users").is_ok());
    }

    #[test]
    fn test_cte_opener_allowed() {
        assert!(check_read_only("WITH recent AS (SELECT * FROM events) SELECT * FROM recent").is_ok());
        assert!(check_read_only("with \"Recent\" as (select 1) select * from \"Recent\"").is_ok());
    }

    #[test]
    fn test_writes_rejected() {
        for sql in [
            "DROP TABLE users",
            "DELETE FROM users",
            "INSERT INTO users VALUES (1)",
            "UPDATE users SET name = 'x'",
            "TRUNCATE users",
            "CREATE TABLE t (id int)",
            "GRANT ALL ON users TO evil",
        ] {
            let err = check_read_only(sql).unwrap_err();
            assert_eq!(err.kind, FaultKind::Policy);
            assert_eq!(err.code.as_deref(), Some(WRITE_OPERATION_NOT_ALLOWED));
            assert!(err.message.contains("read-only queries are allowed"));
        }
    }

    #[test]
    fn test_prefix_match_requires_word_boundary() {
        // "selection" is not "select"; unmatched statements are rejected,
        // never heuristically allowed.
        assert!(check_read_only("SELECTION_SORT()").is_err());
        assert!(check_read_only("described_by 1").is_err());
    }

    #[test]
    fn test_disguised_cte_write_rejected() {
        // A CTE opener followed by anything is accepted by the coarse prefix
        // rule, but a bare WITH that does not match `with <ident> as (` is not.
        assert!(check_read_only("WITH DELETE").is_err());
        assert!(check_read_only("WITHDRAW FROM accounts").is_err());
    }

    #[test]
    fn test_empty_statement_rejected() {
        assert!(check_read_only("").is_err());
        assert!(check_read_only("   ").is_err());
    }
}
