//! Capabilities the query builder and analyzer need from a database backend.
//!
//! `SqlFormatter` covers the pure, dialect-specific text rendering;
//! `DatabaseAdapter` adds execution. `DatabaseManager` is the
//! connection-level collaborator: execution plus connection metadata.
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use super::query::{FilterOperator, QueryResult, TableFilter};
use crate::dialect::Dialect;

/// Dialect-specific rendering of identifiers, values and predicates.
pub trait SqlFormatter: Send + Sync {
    /// Quote an identifier, which may be schema-qualified.
    fn escape_identifier(&self, identifier: &str) -> String;

    /// Render a JSON value as a SQL literal.
    fn escape_value(&self, value: &Value) -> String {
        sql_literal(value)
    }

    /// Render one WHERE fragment for `filter`.
    ///
    /// An empty string means the filter contributes nothing and is dropped
    /// by the caller: a blank column, a missing comparison value, or an
    /// empty `IN` list.
    fn build_where_clause(&self, filter: &TableFilter) -> String {
        if filter.column.trim().is_empty() {
            return String::new();
        }
        let column = self.escape_identifier(&filter.column);

        match filter.operator {
            op if op.is_unary() => format!("{} {}", column, op.as_sql()),
            FilterOperator::In => match &filter.value {
                Value::Array(items) if items.is_empty() => String::new(),
                Value::Array(_) => format!("{} IN {}", column, self.escape_value(&filter.value)),
                Value::Null => String::new(),
                single => format!("{} IN ({})", column, self.escape_value(single)),
            },
            op => {
                if filter.value.is_null() {
                    return String::new();
                }
                format!("{} {} {}", column, op.as_sql(), self.escape_value(&filter.value))
            }
        }
    }

    /// Count expression for pagination totals. `None` means `COUNT(*)`.
    fn count_expression(&self) -> Option<String> {
        None
    }
}

#[async_trait]
pub trait DatabaseAdapter: SqlFormatter {
    /// Execute one statement on the given connection.
    ///
    /// Database errors come back as a failed `QueryResult`; `Err` is
    /// reserved for faults outside the database itself.
    async fn query(
        &self,
        connection_id: &str,
        sql: &str,
        session_id: Option<&str>,
    ) -> Result<QueryResult>;
}

#[async_trait]
pub trait DatabaseManager: Send + Sync {
    async fn query(
        &self,
        connection_id: &str,
        sql: &str,
        session_id: Option<&str>,
    ) -> Result<QueryResult>;

    /// Declared dialect of a connection, `None` when nothing is recorded.
    async fn connection_dialect(&self, connection_id: &str) -> Option<String>;
}

impl SqlFormatter for Dialect {
    fn escape_identifier(&self, identifier: &str) -> String {
        self.quote_identifier(identifier)
    }

    fn escape_value(&self, value: &Value) -> String {
        if self.backslash_escapes() {
            backslash_sql_literal(value)
        } else {
            sql_literal(value)
        }
    }

    fn count_expression(&self) -> Option<String> {
        Dialect::count_expression(self).map(str::to_string)
    }
}

/// Standard SQL literal for a JSON value. Strings are single-quoted with
/// embedded quotes doubled; arrays become a parenthesized list.
pub fn sql_literal(value: &Value) -> String {
    render_literal(value, false)
}

/// Literal for engines that read `\` as an escape inside strings (MySQL,
/// ClickHouse). Backslashes are doubled before quoting.
pub fn backslash_sql_literal(value: &Value) -> String {
    render_literal(value, true)
}

fn render_literal(value: &Value, backslash_escapes: bool) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_string(s, backslash_escapes),
        Value::Array(items) => {
            let rendered: Vec<String> = items
                .iter()
                .map(|item| render_literal(item, backslash_escapes))
                .collect();
            format!("({})", rendered.join(", "))
        }
        Value::Object(_) => quote_string(&value.to_string(), backslash_escapes),
    }
}

fn quote_string(s: &str, backslash_escapes: bool) -> String {
    let escaped = if backslash_escapes {
        s.replace('\\', "\\\\").replace('\'', "''")
    } else {
        s.replace('\'', "''")
    };
    format!("'{}'", escaped)
}
