//! Per-call connection adapter.
//!
//! Each operation opens its own connection, issues one logical unit of work
//! and releases the connection on every exit path via [`with_released`].
//! Native driver errors are reclassified into [`ToolError`] and never carry
//! the connection URL.

use crate::config::PgConfig;
use crate::readonly::check_read_only;
use crate::rows::row_to_json;
use crate::BACKEND;
use futures::future::BoxFuture;
use gantry_core::ToolError;
use serde_json::{json, Value};
use sqlx::postgres::PgRow;
use sqlx::{Connection, PgConnection, Row};
use std::time::Instant;

/// Result of a statement execution: mapped rows plus elapsed wall time.
#[derive(Debug)]
pub struct QueryOutcome {
    pub rows: Vec<Value>,
    pub elapsed_ms: u128,
}

/// Result of the table-description composite.
#[derive(Debug)]
pub struct TableDescription {
    pub columns: Vec<Value>,
    pub primary_keys: Vec<String>,
    pub elapsed_ms: u128,
}

pub struct PgAdapter {
    config: PgConfig,
}

impl PgAdapter {
    pub fn new(config: PgConfig) -> Self {
        Self { config }
    }

    /// One-shot startup probe. Opens and releases a connection like any
    /// other call.
    pub async fn test_connectivity(&self) -> Result<(), ToolError> {
        let conn = self.connect().await?;
        with_released(
            conn,
            |conn| {
                Box::pin(async move {
                    sqlx::query("SELECT 1")
                        .execute(&mut *conn)
                        .await
                        .map(|_| ())
                        .map_err(classify)
                })
            },
            close_quietly,
        )
        .await
    }

    /// Run a read-only statement and map its rows to JSON.
    ///
    /// The allow-list check runs before any connection is opened; a rejected
    /// statement never touches the network.
    pub async fn run_query(&self, sql: &str) -> Result<QueryOutcome, ToolError> {
        check_read_only(sql)?;

        let started = Instant::now();
        let conn = self.connect().await?;
        let sql = sql.to_string();
        let rows = with_released(
            conn,
            move |conn| {
                Box::pin(async move {
                    sqlx::query(&sql)
                        .fetch_all(&mut *conn)
                        .await
                        .map_err(classify)
                })
            },
            close_quietly,
        )
        .await?;

        Ok(QueryOutcome {
            rows: rows.iter().map(row_to_json).collect(),
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    /// List tables in one schema.
    pub async fn list_tables(&self, schema: &str) -> Result<QueryOutcome, ToolError> {
        let started = Instant::now();
        let conn = self.connect().await?;
        let schema = schema.to_string();
        let rows = with_released(
            conn,
            move |conn| {
                Box::pin(async move {
                    sqlx::query(
                        "SELECT table_name, table_type \
                         FROM information_schema.tables \
                         WHERE table_schema = $1 \
                         ORDER BY table_name",
                    )
                    .bind(&schema)
                    .fetch_all(&mut *conn)
                    .await
                    .map_err(classify)
                })
            },
            close_quietly,
        )
        .await?;

        Ok(QueryOutcome {
            rows: rows.iter().map(row_to_json).collect(),
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    /// Describe a table: column catalog joined with the primary-key
    /// constraint catalog. Two statements, one connection, one atomic call —
    /// if either fails the whole call fails.
    pub async fn describe_table(
        &self,
        schema: &str,
        table: &str,
    ) -> Result<TableDescription, ToolError> {
        let started = Instant::now();
        let conn = self.connect().await?;
        let schema_owned = schema.to_string();
        let table_owned = table.to_string();

        let (columns, pk_rows) = with_released(
            conn,
            move |conn| {
                Box::pin(async move {
                    let columns = sqlx::query(
                        "SELECT column_name, data_type, is_nullable, column_default \
                         FROM information_schema.columns \
                         WHERE table_schema = $1 AND table_name = $2 \
                         ORDER BY ordinal_position",
                    )
                    .bind(&schema_owned)
                    .bind(&table_owned)
                    .fetch_all(&mut *conn)
                    .await
                    .map_err(classify)?;

                    if columns.is_empty() {
                        return Err(ToolError::backend(
                            BACKEND,
                            format!("relation \"{}.{}\" does not exist", schema_owned, table_owned),
                        )
                        .with_code("42P01"));
                    }

                    let pk_rows = sqlx::query(
                        "SELECT kcu.column_name \
                         FROM information_schema.table_constraints tc \
                         JOIN information_schema.key_column_usage kcu \
                           ON tc.constraint_name = kcu.constraint_name \
                          AND tc.table_schema = kcu.table_schema \
                         WHERE tc.constraint_type = 'PRIMARY KEY' \
                           AND tc.table_schema = $1 AND tc.table_name = $2 \
                         ORDER BY kcu.ordinal_position",
                    )
                    .bind(&schema_owned)
                    .bind(&table_owned)
                    .fetch_all(&mut *conn)
                    .await
                    .map_err(classify)?;

                    Ok((columns, pk_rows))
                })
            },
            close_quietly,
        )
        .await?;

        let columns = columns
            .iter()
            .map(|row: &PgRow| {
                json!({
                    "name": row.try_get::<String, _>("column_name").unwrap_or_default(),
                    "dataType": row.try_get::<String, _>("data_type").unwrap_or_default(),
                    "nullable": row.try_get::<String, _>("is_nullable").map(|v| v == "YES").unwrap_or(false),
                    "default": row.try_get::<Option<String>, _>("column_default").ok().flatten(),
                })
            })
            .collect();
        let primary_keys = pk_rows
            .iter()
            .map(|row| row.try_get::<String, _>("column_name").unwrap_or_default())
            .collect();

        Ok(TableDescription {
            columns,
            primary_keys,
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    async fn connect(&self) -> Result<PgConnection, ToolError> {
        PgConnection::connect(&self.config.database_url)
            .await
            .map_err(classify)
    }
}

// ============================================================================
// Connection release
// ============================================================================

/// Issue one unit of work and release the session on every exit path.
/// The work result is only surfaced after release has run.
pub(crate) async fn with_released<S, T>(
    mut session: S,
    work: impl for<'a> FnOnce(&'a mut S) -> BoxFuture<'a, Result<T, ToolError>>,
    release: impl FnOnce(S) -> BoxFuture<'static, ()>,
) -> Result<T, ToolError>
where
    S: Send + 'static,
{
    let result = work(&mut session).await;
    release(session).await;
    result
}

fn close_quietly(conn: PgConnection) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        if let Err(e) = conn.close().await {
            tracing::debug!("error closing connection: {}", e);
        }
    })
}

// ============================================================================
// Error classification
// ============================================================================

/// Reclassify a driver error. Backend-reported faults keep the server's own
/// SQLSTATE code; transport-level failures become connection faults.
pub(crate) fn classify(err: sqlx::Error) -> ToolError {
    match err {
        sqlx::Error::Database(db) => {
            let mut tool_err = ToolError::backend(BACKEND, db.message());
            if let Some(code) = db.code() {
                tool_err = tool_err.with_code(code.to_string());
            }
            tool_err
        }
        sqlx::Error::Io(e) => ToolError::connection(BACKEND, e.to_string()),
        sqlx::Error::Tls(e) => ToolError::connection(BACKEND, e.to_string()),
        sqlx::Error::Configuration(e) => ToolError::connection(BACKEND, e.to_string()),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            ToolError::connection(BACKEND, "connection unavailable")
        }
        other => ToolError::unexpected(other.to_string()),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readonly::WRITE_OPERATION_NOT_ALLOWED;
    use gantry_core::FaultKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct SpySession {
        closed: Arc<AtomicUsize>,
    }

    fn spy() -> (SpySession, Arc<AtomicUsize>) {
        let closed = Arc::new(AtomicUsize::new(0));
        (
            SpySession {
                closed: Arc::clone(&closed),
            },
            closed,
        )
    }

    fn release_spy(session: SpySession) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            session.closed.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn test_release_runs_once_on_success() {
        let (session, closed) = spy();
        let result = with_released(session, |_s| Box::pin(async { Ok(42) }), release_spy).await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_runs_once_on_failure() {
        let (session, closed) = spy();
        let result: Result<(), _> = with_released(
            session,
            |_s| Box::pin(async { Err(ToolError::backend(BACKEND, "boom")) }),
            release_spy,
        )
        .await;
        assert!(result.is_err());
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_write_statement_rejected_before_any_connection() {
        // The adapter points at a closed port; a policy rejection (rather
        // than a connection fault) proves no connect was attempted.
        let adapter = PgAdapter::new(PgConfig {
            database_url: "postgres://nobody@127.0.0.1:1/nothing".to_string(),
        });
        let err = adapter.run_query("DROP TABLE users").await.unwrap_err();
        assert_eq!(err.kind, FaultKind::Policy);
        assert_eq!(err.code.as_deref(), Some(WRITE_OPERATION_NOT_ALLOWED));
    }
}
