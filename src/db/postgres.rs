//! PostgreSQL backend over a single `tokio_postgres::Client`.
//!
//! Implements both the adapter and the manager capability so it can back
//! the pagination builder directly and be registered into a
//! `ConnectionManager`.
use std::error::Error as StdError;
use std::fmt;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{json, Value};
use thiserror::Error;
use tokio_postgres::{types::Type, Client, Row as PgRow};

use super::adapter::{DatabaseAdapter, DatabaseManager, SqlFormatter};
use super::query::{QueryResult, Row};
use crate::dialect::Dialect;

/// Categorized error types for SQL query failures.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorCategory {
    /// Syntax errors (SQLSTATE 42601, 42000)
    Syntax,
    /// Semantic errors (missing table/column, ambiguous reference)
    Semantic,
    /// Execution/runtime errors (division by zero, constraint violation)
    Execution,
    Transaction,
    Connection,
    Unknown,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Syntax => write!(f, "Syntax Error"),
            ErrorCategory::Semantic => write!(f, "Semantic Error"),
            ErrorCategory::Execution => write!(f, "Execution Error"),
            ErrorCategory::Transaction => write!(f, "Transaction Error"),
            ErrorCategory::Connection => write!(f, "Connection Error"),
            ErrorCategory::Unknown => write!(f, "Error"),
        }
    }
}

/// Database error with the context PostgreSQL reports alongside it.
#[derive(Debug, Clone, Error)]
#[error("{category}: {message}")]
pub struct BackendError {
    pub category: ErrorCategory,
    /// SQLSTATE code, empty for non-database errors
    pub code: String,
    pub message: String,
    pub detail: Option<String>,
    pub hint: Option<String>,
    /// 1-based (line, column) of the error position within the statement
    pub location: Option<(usize, usize)>,
}

impl BackendError {
    pub fn from_pg_error(err: &tokio_postgres::Error, sql: &str) -> Self {
        let Some(db_err) = err.as_db_error() else {
            let category = if err.source().is_some() {
                ErrorCategory::Connection
            } else {
                ErrorCategory::Unknown
            };
            return BackendError {
                category,
                code: String::new(),
                message: err.to_string(),
                detail: err.source().map(|e| e.to_string()),
                hint: None,
                location: None,
            };
        };

        let code = db_err.code().code().to_string();
        let location = db_err.position().and_then(|p| match p {
            tokio_postgres::error::ErrorPosition::Original(pos) => {
                Some(byte_offset_to_line_col(sql, *pos as usize))
            }
            tokio_postgres::error::ErrorPosition::Internal { .. } => None,
        });

        BackendError {
            category: categorize_sqlstate(&code),
            code,
            message: db_err.message().to_string(),
            detail: db_err.detail().map(|s| s.to_string()),
            hint: db_err.hint().map(|s| s.to_string()),
            location,
        }
    }

    /// Multi-line message suitable for showing to a user or an LLM.
    pub fn display_full(&self) -> String {
        let mut lines = vec![format!("{}: {}", self.category, self.message)];

        if let Some((line, col)) = self.location {
            lines.push(format!("  at line {}, column {}", line, col));
        }
        if !self.code.is_empty() {
            lines.push(format!("  SQLSTATE: {}", self.code));
        }
        if let Some(detail) = &self.detail {
            lines.push(format!("  Detail: {}", detail));
        }
        if let Some(hint) = &self.hint {
            lines.push(format!("  Hint: {}", hint));
        }

        lines.join("\n")
    }
}

/// Convert a 1-based byte offset into 1-based (line, column).
fn byte_offset_to_line_col(query: &str, byte_pos: usize) -> (usize, usize) {
    if byte_pos == 0 || query.is_empty() {
        return (1, 1);
    }
    let target = (byte_pos - 1).min(query.len());
    let mut line = 1usize;
    let mut col = 1usize;
    for (i, ch) in query.char_indices() {
        if i >= target {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

fn categorize_sqlstate(code: &str) -> ErrorCategory {
    if code.len() < 2 {
        return ErrorCategory::Unknown;
    }
    match &code[..2] {
        "42" => {
            if code == "42601" || code == "42000" {
                ErrorCategory::Syntax
            } else {
                ErrorCategory::Semantic
            }
        }
        "22" | "23" | "53" | "54" | "55" | "57" => ErrorCategory::Execution,
        "25" | "40" => ErrorCategory::Transaction,
        "08" => ErrorCategory::Connection,
        _ => ErrorCategory::Unknown,
    }
}

pub struct PostgresBackend {
    client: Client,
}

impl PostgresBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn execute(&self, sql: &str) -> QueryResult {
        let start = Instant::now();
        let sql_trimmed = sql.trim();

        match self.client.query(sql_trimmed, &[]).await {
            Ok(rows) => {
                tracing::debug!(
                    rows = rows.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "query completed"
                );
                QueryResult::ok(rows.iter().map(row_to_json).collect())
            }
            Err(e) => {
                let err = BackendError::from_pg_error(&e, sql_trimmed);
                tracing::debug!(code = %err.code, "query failed: {}", err.message);
                QueryResult::failure(err.display_full())
            }
        }
    }
}

impl SqlFormatter for PostgresBackend {
    fn escape_identifier(&self, identifier: &str) -> String {
        Dialect::PostgreSql.quote_identifier(identifier)
    }
}

#[async_trait]
impl DatabaseAdapter for PostgresBackend {
    async fn query(
        &self,
        _connection_id: &str,
        sql: &str,
        _session_id: Option<&str>,
    ) -> Result<QueryResult> {
        Ok(self.execute(sql).await)
    }
}

#[async_trait]
impl DatabaseManager for PostgresBackend {
    async fn query(
        &self,
        _connection_id: &str,
        sql: &str,
        _session_id: Option<&str>,
    ) -> Result<QueryResult> {
        Ok(self.execute(sql).await)
    }

    async fn connection_dialect(&self, _connection_id: &str) -> Option<String> {
        Some(Dialect::PostgreSql.id().to_string())
    }
}

fn row_to_json(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| (col.name().to_string(), extract_value(row, i, col.type_())))
        .collect()
}

fn extract_value(row: &PgRow, idx: usize, pg_type: &Type) -> Value {
    fn get<'a, T>(row: &'a PgRow, idx: usize) -> Option<T>
    where
        T: tokio_postgres::types::FromSql<'a>,
    {
        row.try_get::<_, Option<T>>(idx).ok().flatten()
    }

    let value = match *pg_type {
        Type::BOOL => get::<bool>(row, idx).map(Value::Bool),
        Type::INT2 => get::<i16>(row, idx).map(|v| json!(v)),
        Type::INT4 => get::<i32>(row, idx).map(|v| json!(v)),
        Type::INT8 => get::<i64>(row, idx).map(|v| json!(v)),
        Type::FLOAT4 => get::<f32>(row, idx).map(|v| json!(v)),
        Type::FLOAT8 => get::<f64>(row, idx).map(|v| json!(v)),
        Type::TEXT | Type::VARCHAR | Type::NAME | Type::CHAR | Type::BPCHAR => {
            get::<String>(row, idx).map(Value::String)
        }
        Type::BYTEA => get::<Vec<u8>>(row, idx).map(|b| json!(format!("[{} bytes]", b.len()))),
        Type::DATE => get::<NaiveDate>(row, idx).map(|d| json!(d.to_string())),
        Type::TIME => get::<NaiveTime>(row, idx).map(|t| json!(t.to_string())),
        Type::TIMESTAMP => get::<NaiveDateTime>(row, idx).map(|dt| json!(dt.to_string())),
        Type::TIMESTAMPTZ => get::<DateTime<Utc>>(row, idx).map(|dt| json!(dt.to_rfc3339())),
        Type::JSON | Type::JSONB => get::<Value>(row, idx),
        _ => get::<String>(row, idx).map(Value::String),
    };
    value.unwrap_or(Value::Null)
}
