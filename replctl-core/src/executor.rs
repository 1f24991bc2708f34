//! Query execution against a single endpoint.
//!
//! [`SqlExecutor`] is the seam between probe logic and the database driver:
//! one short-lived connection per call, a single attempt, and every driver
//! error caught at this boundary and returned as the call's failure outcome.
//! The production implementation is [`PgExecutor`]; the verifier only ever
//! sees the trait, so tests can substitute a mock.
//!
//! Values are always passed as bind parameters. The only thing ever spliced
//! into statement text is a table name, and that must first pass
//! [`valid_table_name`].

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgConnection, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Connection, Postgres, Row, TypeInfo};
use tracing::{debug, warn};

use crate::endpoint::EndpointConfig;
use crate::error::{ProbeError, Result};

/// Whether a statement fetches rows or mutates data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Execute and eagerly fetch every result row
    Read,
    /// Execute, commit, and return the affected-row count
    Write,
}

/// A typed column value.
///
/// Covers the types the probe table and health checks produce; Postgres
/// types outside this set degrade to their text form where the driver can
/// decode one, else `Null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl std::fmt::Display for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Bool(v) => write!(f, "{v}"),
            SqlValue::Int(v) => write!(f, "{v}"),
            SqlValue::Float(v) => write!(f, "{v}"),
            SqlValue::Text(v) => write!(f, "{v}"),
            SqlValue::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

impl SqlValue {
    fn bind_to<'q>(
        &self,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Query<'q, Postgres, PgArguments> {
        match self {
            SqlValue::Null => query.bind(Option::<String>::None),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Float(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::Timestamp(v) => query.bind(*v),
        }
    }
}

/// One result row: an ordered mapping of column name to value.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlRow {
    columns: Vec<(String, SqlValue)>,
}

impl SqlRow {
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    /// Value of the first column with this name, if present.
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> &[(String, SqlValue)] {
        &self.columns
    }
}

impl Serialize for SqlRow {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Successful result of one executor call; failure is the `Err` side of the
/// call, never encoded in here.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    /// Eagerly fetched result rows of a `Read`
    Rows(Vec<SqlRow>),
    /// Affected-row count of a committed `Write`
    RowsAffected(u64),
}

/// Executes one statement against one endpoint per call.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Open a connection to `endpoint`, run `query` with `params` bound
    /// positionally, and release the connection on every exit path.
    ///
    /// Driver failures (connection refused, authentication, malformed SQL,
    /// timeouts) are logged with the endpoint label and returned as the
    /// call's error; they never panic and never retry.
    async fn execute(
        &self,
        endpoint: &EndpointConfig,
        query: &str,
        params: &[SqlValue],
        mode: QueryMode,
    ) -> Result<QueryOutput>;
}

/// Production executor backed by sqlx/Postgres.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgExecutor;

#[async_trait]
impl SqlExecutor for PgExecutor {
    async fn execute(
        &self,
        endpoint: &EndpointConfig,
        query: &str,
        params: &[SqlValue],
        mode: QueryMode,
    ) -> Result<QueryOutput> {
        endpoint.validate()?;

        let options: PgConnectOptions = endpoint.connection_string().parse().map_err(|e| {
            warn!(endpoint = %endpoint.label, error = %e, "connection string rejected by driver");
            ProbeError::connection_failed(endpoint.label.clone(), e)
        })?;

        let mut conn = PgConnection::connect_with(&options).await.map_err(|e| {
            warn!(endpoint = %endpoint.label, error = %e, "failed to connect");
            ProbeError::connection_failed(endpoint.label.clone(), e)
        })?;

        let outcome = run_statement(&mut conn, query, params, mode).await;
        match outcome {
            Ok(output) => {
                // polite close; the session is gone either way
                conn.close().await.ok();
                Ok(output)
            }
            Err(e) => {
                warn!(endpoint = %endpoint.label, error = %e, "query failed");
                Err(ProbeError::query_failed(endpoint.label.clone(), e))
            }
        }
    }
}

async fn run_statement(
    conn: &mut PgConnection,
    sql: &str,
    params: &[SqlValue],
    mode: QueryMode,
) -> sqlx::Result<QueryOutput> {
    let mut query = sqlx::query(sql);
    for param in params {
        query = param.bind_to(query);
    }

    match mode {
        QueryMode::Read => {
            let rows = query.fetch_all(&mut *conn).await?;
            debug!(rows = rows.len(), "fetched result set");
            Ok(QueryOutput::Rows(rows.iter().map(decode_row).collect()))
        }
        QueryMode::Write => {
            let done = query.execute(&mut *conn).await?;
            debug!(rows_affected = done.rows_affected(), "statement committed");
            Ok(QueryOutput::RowsAffected(done.rows_affected()))
        }
    }
}

fn decode_row(row: &PgRow) -> SqlRow {
    let columns = row
        .columns()
        .iter()
        .map(|col| {
            let value = decode_value(row, col.ordinal(), col.type_info().name());
            (col.name().to_string(), value)
        })
        .collect();
    SqlRow::new(columns)
}

fn decode_value(row: &PgRow, idx: usize, type_name: &str) -> SqlValue {
    fn opt<T>(value: sqlx::Result<Option<T>>) -> Option<T> {
        value.ok().flatten()
    }

    let decoded = match type_name {
        "BOOL" => opt(row.try_get::<Option<bool>, _>(idx)).map(SqlValue::Bool),
        "INT2" => opt(row.try_get::<Option<i16>, _>(idx)).map(|v| SqlValue::Int(v.into())),
        "INT4" => opt(row.try_get::<Option<i32>, _>(idx)).map(|v| SqlValue::Int(v.into())),
        "INT8" => opt(row.try_get::<Option<i64>, _>(idx)).map(SqlValue::Int),
        "FLOAT4" => opt(row.try_get::<Option<f32>, _>(idx)).map(|v| SqlValue::Float(v.into())),
        "FLOAT8" => opt(row.try_get::<Option<f64>, _>(idx)).map(SqlValue::Float),
        "TIMESTAMPTZ" => {
            opt(row.try_get::<Option<DateTime<Utc>>, _>(idx)).map(SqlValue::Timestamp)
        }
        "TIMESTAMP" => opt(row.try_get::<Option<NaiveDateTime>, _>(idx))
            .map(|v| SqlValue::Timestamp(v.and_utc())),
        _ => opt(row.try_get::<Option<String>, _>(idx)).map(SqlValue::Text),
    };
    decoded.unwrap_or(SqlValue::Null)
}

/// Accept a table name only if every dot-separated segment is a plain SQL
/// identifier. Anything else is rejected before it can reach statement text.
pub fn valid_table_name(name: &str) -> Result<&str> {
    let ok = !name.is_empty()
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) if first.is_ascii_alphabetic() || first == '_' => {
                    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
                }
                _ => false,
            }
        });
    if ok {
        Ok(name)
    } else {
        Err(ProbeError::InvalidTable(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_valid_table_names() {
        assert!(valid_table_name("testdata").is_ok());
        assert!(valid_table_name("dbo.TestData").is_ok());
        assert!(valid_table_name("_probe_2024").is_ok());
    }

    #[test]
    fn test_invalid_table_names_rejected() {
        for bad in ["", "1table", "probe;drop table x", "a b", "x.", ".x", "t'"] {
            let err = valid_table_name(bad).unwrap_err();
            assert!(matches!(err, ProbeError::InvalidTable(_)), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_row_lookup_by_column_name() {
        let row = SqlRow::new(vec![
            ("id".into(), SqlValue::Int(7)),
            ("value".into(), SqlValue::Text("repl-test".into())),
        ]);
        assert_eq!(row.get("id"), Some(&SqlValue::Int(7)));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.columns().len(), 2);
    }

    #[test]
    fn test_row_serializes_as_object() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let row = SqlRow::new(vec![
            ("id".into(), SqlValue::Int(7)),
            ("value".into(), SqlValue::Text("repl-test".into())),
            ("created_at".into(), SqlValue::Timestamp(ts)),
            ("note".into(), SqlValue::Null),
        ]);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["value"], "repl-test");
        assert!(json["created_at"].as_str().unwrap().starts_with("2024-01-01T12:00:00"));
        assert!(json["note"].is_null());
    }

    #[test]
    fn test_value_display() {
        assert_eq!(SqlValue::Null.to_string(), "NULL");
        assert_eq!(SqlValue::Int(42).to_string(), "42");
        assert_eq!(SqlValue::Text("abc".into()).to_string(), "abc");
    }
}
