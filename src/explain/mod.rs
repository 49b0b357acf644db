//! EXPLAIN construction, execution and plan normalization.
//!
//! ```text
//! sql + connection
//!       ↓
//! ExplainConfig         (prefix per dialect, mutable at runtime)
//!       ↓
//! DatabaseManager       (one bare-EXPLAIN retry on failure)
//!       ↓
//! RawPlan → PlanAnalysis (plan.rs)
//! ```
pub mod analyzer;
pub mod plan;

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Result;
use once_cell::sync::Lazy;

use crate::dialect::{normalize_dialect, Dialect};

pub use analyzer::{QueryPerformanceAnalyzer, QueryPerformanceResult, DEFAULT_DATABASE};
pub use plan::{
    detect_query_type, extract_metrics, format_duration_ms, is_explain_query,
    parse_execution_plan, MetricsError, PerformanceMetrics, PlanAnalysis, QueryType, RawPlan,
};

/// Prefix used for dialects without an entry, and for the fallback retry.
pub const BARE_EXPLAIN: &str = "EXPLAIN";

/// Dialect id -> EXPLAIN prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainConfig {
    prefixes: BTreeMap<String, String>,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        let prefixes = Dialect::ALL
            .iter()
            .map(|d| (d.id().to_string(), d.default_explain_prefix().to_string()))
            .collect();
        Self { prefixes }
    }
}

impl ExplainConfig {
    /// A table with no entries: every dialect gets a bare `EXPLAIN`.
    pub fn empty() -> Self {
        Self {
            prefixes: BTreeMap::new(),
        }
    }

    pub fn prefix_for(&self, dialect: &str) -> &str {
        self.prefixes
            .get(&normalize_dialect(dialect))
            .map(String::as_str)
            .unwrap_or(BARE_EXPLAIN)
    }

    pub fn is_registered(&self, dialect: &str) -> bool {
        self.prefixes.contains_key(&normalize_dialect(dialect))
    }

    /// Add or replace the prefix of one dialect.
    pub fn update(&mut self, dialect: &str, prefix: &str) -> Result<()> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            anyhow::bail!("EXPLAIN prefix for '{}' must not be empty", dialect);
        }
        self.prefixes
            .insert(normalize_dialect(dialect), prefix.to_string());
        Ok(())
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.prefixes
    }

    /// `"<prefix> <sql>"`, with `sql` appended exactly as given.
    pub fn build_explain_query(&self, sql: &str, dialect: &str) -> String {
        format!("{} {}", self.prefix_for(dialect), sql)
    }
}

pub fn build_bare_explain_query(sql: &str) -> String {
    format!("{} {}", BARE_EXPLAIN, sql)
}

/// Shared handle to a configuration table.
pub type SharedExplainConfig = Arc<RwLock<ExplainConfig>>;

static EXPLAIN_CONFIG: Lazy<SharedExplainConfig> =
    Lazy::new(|| Arc::new(RwLock::new(ExplainConfig::default())));

/// Handle to the process-wide table. Populate it at startup; concurrent
/// updates while analyses are in flight should be serialized by the caller.
pub fn shared_explain_config() -> SharedExplainConfig {
    EXPLAIN_CONFIG.clone()
}

/// Snapshot of the process-wide table.
pub fn explain_configs() -> BTreeMap<String, String> {
    EXPLAIN_CONFIG
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .entries()
        .clone()
}

/// Override the process-wide prefix of one dialect.
pub fn update_explain_config(dialect: &str, prefix: &str) -> Result<()> {
    EXPLAIN_CONFIG
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .update(dialect, prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_prefixes() {
        let config = ExplainConfig::default();
        let sql = "SELECT * FROM orders WHERE id = 1";
        for (dialect, prefix) in config.entries() {
            assert_eq!(
                config.build_explain_query(sql, dialect),
                format!("{} {}", prefix, sql)
            );
        }
        assert_eq!(
            config.build_explain_query(sql, "postgresql"),
            "EXPLAIN (ANALYZE, FORMAT JSON) SELECT * FROM orders WHERE id = 1"
        );
        assert_eq!(
            config.build_explain_query(sql, "MySQL"),
            "EXPLAIN FORMAT=JSON SELECT * FROM orders WHERE id = 1"
        );
    }

    #[test]
    fn test_unregistered_dialect_uses_bare_explain() {
        let config = ExplainConfig::default();
        assert!(!config.is_registered("oracle"));
        assert_eq!(config.build_explain_query("SELECT 1", "oracle"), "EXPLAIN SELECT 1");
        assert_eq!(config.build_explain_query("SELECT 1", "unknown"), "EXPLAIN SELECT 1");
    }

    #[test]
    fn test_sql_is_appended_verbatim() {
        let config = ExplainConfig::empty();
        assert_eq!(
            config.build_explain_query(" SELECT 1; ", "x"),
            "EXPLAIN  SELECT 1; "
        );
    }

    #[test]
    fn test_update_adds_and_overrides() {
        let mut config = ExplainConfig::default();
        config.update("Snowflake", "EXPLAIN USING JSON").unwrap();
        assert_eq!(
            config.build_explain_query("SELECT 1", "snowflake"),
            "EXPLAIN USING JSON SELECT 1"
        );

        config.update("postgres", "EXPLAIN (FORMAT JSON)").unwrap();
        assert_eq!(config.prefix_for("postgresql"), "EXPLAIN (FORMAT JSON)");
    }

    #[test]
    fn test_update_rejects_blank_prefix() {
        let mut config = ExplainConfig::default();
        assert!(config.update("mysql", "   ").is_err());
        assert_eq!(config.prefix_for("mysql"), "EXPLAIN FORMAT=JSON");
    }

    #[test]
    fn test_process_wide_table() {
        update_explain_config("test-engine-mod", "EXPLAIN PIPELINE").unwrap();
        assert_eq!(
            explain_configs().get("test-engine-mod").map(String::as_str),
            Some("EXPLAIN PIPELINE")
        );
        let shared = shared_explain_config();
        let guard = shared.read().unwrap();
        assert_eq!(guard.prefix_for("TEST-ENGINE-MOD"), "EXPLAIN PIPELINE");
    }
}
