//! SQL dialect identification.
//!
//! Dialects travel through the system as lower-cased string ids so that
//! callers can register knowledge for engines this crate has never heard
//! of. The `Dialect` enum is the closed set of engines with built-in
//! knowledge; every per-dialect default lives in one of its methods.
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::{self, DatabaseContextProvider};

/// Dialect id used when a connection has no recorded dialect.
pub const UNKNOWN_DIALECT: &str = "unknown";

/// Lower-case and trim a dialect id, folding known aliases onto their
/// canonical id. Unrecognized ids are returned lower-cased, never rejected.
pub fn normalize_dialect(dialect: &str) -> String {
    let lowered = dialect.trim().to_lowercase();
    match lowered.as_str() {
        "postgres" | "pg" | "pgsql" => "postgresql".to_string(),
        "mariadb" => "mysql".to_string(),
        "sqlite3" => "sqlite".to_string(),
        "ch" => "clickhouse".to_string(),
        _ => lowered,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    PostgreSql,
    MySql,
    ClickHouse,
    Sqlite,
    DuckDb,
    Default,
}

impl Dialect {
    /// Every dialect with built-in knowledge, `Default` last.
    pub const ALL: [Dialect; 6] = [
        Dialect::PostgreSql,
        Dialect::MySql,
        Dialect::ClickHouse,
        Dialect::Sqlite,
        Dialect::DuckDb,
        Dialect::Default,
    ];

    /// Resolve a dialect id. Never fails: unknown ids map to `Default`.
    pub fn from_id(id: &str) -> Self {
        match normalize_dialect(id).as_str() {
            "postgresql" => Dialect::PostgreSql,
            "mysql" => Dialect::MySql,
            "clickhouse" => Dialect::ClickHouse,
            "sqlite" => Dialect::Sqlite,
            "duckdb" => Dialect::DuckDb,
            _ => Dialect::Default,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Dialect::PostgreSql => "postgresql",
            Dialect::MySql => "mysql",
            Dialect::ClickHouse => "clickhouse",
            Dialect::Sqlite => "sqlite",
            Dialect::DuckDb => "duckdb",
            Dialect::Default => "default",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Dialect::PostgreSql => "PostgreSQL",
            Dialect::MySql => "MySQL",
            Dialect::ClickHouse => "ClickHouse",
            Dialect::Sqlite => "SQLite",
            Dialect::DuckDb => "DuckDB",
            Dialect::Default => "Generic SQL",
        }
    }

    /// EXPLAIN prefix seeded into the explain configuration table.
    pub fn default_explain_prefix(&self) -> &'static str {
        match self {
            Dialect::PostgreSql => "EXPLAIN (ANALYZE, FORMAT JSON)",
            Dialect::MySql => "EXPLAIN FORMAT=JSON",
            Dialect::ClickHouse => "EXPLAIN",
            Dialect::Sqlite => "EXPLAIN QUERY PLAN",
            Dialect::DuckDb => "EXPLAIN ANALYZE",
            Dialect::Default => "EXPLAIN",
        }
    }

    fn identifier_quote(&self) -> char {
        match self {
            Dialect::MySql | Dialect::ClickHouse => '`',
            _ => '"',
        }
    }

    /// Quote a possibly schema-qualified identifier (`schema.table`).
    /// Each part is quoted separately and embedded quotes are doubled.
    pub fn quote_identifier(&self, identifier: &str) -> String {
        let quote = self.identifier_quote();
        let doubled = format!("{quote}{quote}");
        identifier
            .split('.')
            .map(|part| {
                let escaped = part.replace(quote, &doubled);
                format!("{quote}{escaped}{quote}")
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Whether `\` starts an escape sequence inside string literals.
    pub fn backslash_escapes(&self) -> bool {
        matches!(self, Dialect::MySql | Dialect::ClickHouse)
    }

    /// Count expression used by the pagination count query, if the engine
    /// prefers something other than `COUNT(*)`.
    pub fn count_expression(&self) -> Option<&'static str> {
        match self {
            Dialect::ClickHouse => Some("count()"),
            _ => None,
        }
    }

    /// Built-in prompt knowledge for this dialect.
    pub fn context_provider(&self) -> Arc<dyn DatabaseContextProvider> {
        match self {
            Dialect::PostgreSql => Arc::new(context::PostgresContext::new()),
            Dialect::MySql => Arc::new(context::MySqlContext::new()),
            Dialect::ClickHouse => Arc::new(context::ClickHouseContext::new()),
            Dialect::Sqlite => Arc::new(context::SqliteContext::new()),
            Dialect::DuckDb => Arc::new(context::DuckDbContext::new()),
            Dialect::Default => Arc::new(context::DefaultContext::new()),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_dialect() {
        assert_eq!(normalize_dialect("MySQL"), "mysql");
        assert_eq!(normalize_dialect("  Postgres "), "postgresql");
        assert_eq!(normalize_dialect("pg"), "postgresql");
        assert_eq!(normalize_dialect("MariaDB"), "mysql");
        assert_eq!(normalize_dialect("Snowflake"), "snowflake");
    }

    #[test]
    fn test_from_id_never_fails() {
        assert_eq!(Dialect::from_id("POSTGRESQL"), Dialect::PostgreSql);
        assert_eq!(Dialect::from_id("clickhouse"), Dialect::ClickHouse);
        assert_eq!(Dialect::from_id("oracle"), Dialect::Default);
        assert_eq!(Dialect::from_id(""), Dialect::Default);
        assert_eq!(Dialect::from_id(UNKNOWN_DIALECT), Dialect::Default);
    }

    #[test]
    fn test_id_round_trips_through_from_id() {
        for dialect in Dialect::ALL {
            assert_eq!(Dialect::from_id(dialect.id()), dialect);
        }
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(Dialect::PostgreSql.quote_identifier("orders"), "\"orders\"");
        assert_eq!(
            Dialect::PostgreSql.quote_identifier("public.orders"),
            "\"public\".\"orders\""
        );
        assert_eq!(Dialect::MySql.quote_identifier("shop.orders"), "`shop`.`orders`");
        assert_eq!(
            Dialect::PostgreSql.quote_identifier("we\"ird"),
            "\"we\"\"ird\""
        );
        assert_eq!(Dialect::ClickHouse.quote_identifier("a`b"), "`a``b`");
    }

    #[test]
    fn test_count_expression() {
        assert_eq!(Dialect::ClickHouse.count_expression(), Some("count()"));
        assert_eq!(Dialect::PostgreSql.count_expression(), None);
    }

    #[test]
    fn test_context_provider_matches_dialect() {
        for dialect in Dialect::ALL {
            let provider = dialect.context_provider();
            assert_eq!(provider.context().id, dialect.id());
        }
    }
}
