use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::plan::{parse_execution_plan, PlanAnalysis, RawPlan};
use super::{build_bare_explain_query, shared_explain_config, ExplainConfig, SharedExplainConfig};
use crate::db::{DatabaseManager, QueryResult};
use crate::dialect::{normalize_dialect, UNKNOWN_DIALECT};

/// Database name reported when the caller does not name one.
pub const DEFAULT_DATABASE: &str = "default";

/// Outcome of one performance analysis.
///
/// On success `explain_query`, `raw_plan` and `analysis` are set; on
/// failure `error` and `attempted_query` (the last EXPLAIN tried) are.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPerformanceResult {
    pub success: bool,
    pub dialect: String,
    pub database: String,
    pub original_query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explain_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_plan: Option<RawPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<PlanAnalysis>,
    /// Whether the bare `EXPLAIN` retry produced this outcome.
    pub used_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempted_query: Option<String>,
    pub analyzed_at: DateTime<Utc>,
}

pub struct QueryPerformanceAnalyzer {
    manager: Arc<dyn DatabaseManager>,
    explain_config: SharedExplainConfig,
}

impl QueryPerformanceAnalyzer {
    /// Analyzer backed by the process-wide EXPLAIN table.
    pub fn new(manager: Arc<dyn DatabaseManager>) -> Self {
        Self {
            manager,
            explain_config: shared_explain_config(),
        }
    }

    /// Analyzer with its own EXPLAIN table.
    pub fn with_explain_config(manager: Arc<dyn DatabaseManager>, config: ExplainConfig) -> Self {
        Self {
            manager,
            explain_config: Arc::new(RwLock::new(config)),
        }
    }

    pub fn explain_configs(&self) -> BTreeMap<String, String> {
        self.explain_config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries()
            .clone()
    }

    pub fn update_explain_config(&self, dialect: &str, prefix: &str) -> Result<()> {
        self.explain_config
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .update(dialect, prefix)
    }

    pub fn build_explain_query(&self, sql: &str, dialect: &str) -> String {
        self.explain_config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .build_explain_query(sql, dialect)
    }

    /// EXPLAIN `sql` on a connection and normalize the plan.
    ///
    /// A failed dialect-specific EXPLAIN is retried once as a bare
    /// `EXPLAIN <sql>`, unless the dialect is unknown or the bare form is
    /// what already failed. Never returns an error: every failure becomes a
    /// result with `success == false`.
    pub async fn analyze_query_performance(
        &self,
        connection_id: &str,
        sql: &str,
        database: Option<&str>,
    ) -> QueryPerformanceResult {
        let dialect = self
            .manager
            .connection_dialect(connection_id)
            .await
            .map(|d| normalize_dialect(&d))
            .unwrap_or_else(|| UNKNOWN_DIALECT.to_string());
        let database = database.unwrap_or(DEFAULT_DATABASE).to_string();

        let mut explain_query = self.build_explain_query(sql, &dialect);
        let mut outcome = self.manager.query(connection_id, &explain_query, None).await;
        let mut used_fallback = false;

        if dialect != UNKNOWN_DIALECT && !succeeded(&outcome) {
            let bare = build_bare_explain_query(sql);
            if bare != explain_query {
                tracing::warn!(
                    dialect = %dialect,
                    "dialect EXPLAIN failed ({}), retrying as bare EXPLAIN",
                    failure_message(&outcome)
                );
                explain_query = bare;
                outcome = self.manager.query(connection_id, &explain_query, None).await;
                used_fallback = true;
            }
        }

        let mut result = QueryPerformanceResult {
            success: false,
            dialect,
            database,
            original_query: sql.to_string(),
            explain_query: None,
            raw_plan: None,
            analysis: None,
            used_fallback,
            error: None,
            attempted_query: None,
            analyzed_at: Utc::now(),
        };

        match outcome {
            Ok(query_result) if query_result.success => {
                let raw_plan = RawPlan::from_rows(&query_result.data);
                let analysis = parse_execution_plan(sql, &raw_plan);
                tracing::debug!(
                    query_type = ?analysis.query_type,
                    metrics = analysis.metrics.is_some(),
                    "plan analyzed"
                );
                result.success = true;
                result.explain_query = Some(explain_query);
                result.raw_plan = Some(raw_plan);
                result.analysis = Some(analysis);
            }
            other => {
                result.error = Some(failure_message(&other));
                result.attempted_query = Some(explain_query);
            }
        }

        result
    }
}

fn succeeded(outcome: &Result<QueryResult>) -> bool {
    matches!(outcome, Ok(result) if result.success)
}

fn failure_message(outcome: &Result<QueryResult>) -> String {
    match outcome {
        Ok(result) => result.error_message(),
        Err(e) => format!("{:#}", e),
    }
}
