//! Normalization of heterogeneous EXPLAIN output.
//!
//! Engines answer EXPLAIN with JSON documents, JSON wrapped in a text
//! column, or plain prose. `RawPlan` is the boundary type for all of them,
//! and metric extraction matches on its shape rather than probing fields.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::db::Row;

/// Coarse statement classification by leading keyword. Purely textual and
/// best-effort: comments or parentheses in front of the keyword yield
/// `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    Ddl,
    System,
    Other,
}

pub fn detect_query_type(sql: &str) -> QueryType {
    let upper = sql.trim_start().to_uppercase();
    let starts = |kw: &str| upper.starts_with(kw);

    if starts("SELECT") {
        QueryType::Select
    } else if starts("INSERT") {
        QueryType::Insert
    } else if starts("UPDATE") {
        QueryType::Update
    } else if starts("DELETE") {
        QueryType::Delete
    } else if starts("CREATE") || starts("ALTER") || starts("DROP") {
        QueryType::Ddl
    } else if starts("SHOW") || starts("DESC") {
        // DESC also covers DESCRIBE
        QueryType::System
    } else {
        QueryType::Other
    }
}

pub fn is_explain_query(query: &str) -> bool {
    let trimmed = query.trim().to_uppercase();
    trimmed.starts_with("EXPLAIN")
}

/// EXPLAIN output as returned by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPlan {
    Text(String),
    Array(Vec<Value>),
    Object(Map<String, Value>),
}

impl RawPlan {
    /// Build the plan from EXPLAIN result rows.
    ///
    /// A single cell holding JSON (natively or as text) becomes that JSON
    /// document; rows of one text column become a text plan, one line per
    /// row; anything else is kept as an array of row objects.
    pub fn from_rows(rows: &[Row]) -> Self {
        if let [row] = rows {
            if row.len() == 1 {
                match row.values().next() {
                    Some(Value::Array(items)) => return RawPlan::Array(items.clone()),
                    Some(Value::Object(map)) => return RawPlan::Object(map.clone()),
                    Some(Value::String(s)) => {
                        if let Some(plan) = parse_json_plan(s) {
                            return plan;
                        }
                    }
                    _ => {}
                }
            }
        }

        let lines: Option<Vec<&str>> = rows
            .iter()
            .map(|row| match row.values().next() {
                Some(Value::String(s)) if row.len() == 1 => Some(s.as_str()),
                _ => None,
            })
            .collect();

        match lines {
            Some(lines) if !lines.is_empty() => RawPlan::Text(lines.join("\n")),
            _ => RawPlan::Array(rows.iter().cloned().map(Value::Object).collect()),
        }
    }

    /// Legible text form handed to the LLM-facing layer.
    pub fn summary(&self) -> String {
        match self {
            RawPlan::Text(text) => text.clone(),
            RawPlan::Array(items) => items
                .iter()
                .map(|item| item.to_string())
                .collect::<Vec<_>>()
                .join("\n"),
            RawPlan::Object(map) => serde_json::to_string_pretty(map).unwrap_or_default(),
        }
    }
}

fn parse_json_plan(text: &str) -> Option<RawPlan> {
    let trimmed = text.trim();
    if !(trimmed.starts_with('[') || trimmed.starts_with('{')) {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed).ok()? {
        Value::Array(items) => Some(RawPlan::Array(items)),
        Value::Object(map) => Some(RawPlan::Object(map)),
        _ => None,
    }
}

/// Dialect-agnostic performance figures. Only the fields a plan format
/// exposes are populated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_rows: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_rows: Option<u64>,
}

impl PerformanceMetrics {
    pub fn is_empty(&self) -> bool {
        self.execution_time_ms.is_none()
            && self.estimated_cost.is_none()
            && self.actual_rows.is_none()
            && self.estimated_rows.is_none()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum MetricsError {
    #[error("plan shape carries no known metrics: {0}")]
    UnrecognizedShape(&'static str),

    #[error("unreadable timing in text plan: {0:?}")]
    InvalidTiming(String),
}

/// Extract metrics from a plan.
///
/// Recognized shapes: a PostgreSQL `FORMAT JSON` array, a MySQL
/// `FORMAT=JSON` object and prose containing `actual time=X..Y`. Missing
/// fields inside a recognized shape just leave that metric unset.
pub fn extract_metrics(plan: &RawPlan) -> Result<PerformanceMetrics, MetricsError> {
    match plan {
        RawPlan::Array(items) => {
            let envelope = items
                .first()
                .and_then(Value::as_object)
                .ok_or(MetricsError::UnrecognizedShape("array without a plan envelope"))?;
            let node = envelope
                .get("Plan")
                .and_then(Value::as_object)
                .ok_or(MetricsError::UnrecognizedShape("array without a Plan node"))?;

            Ok(PerformanceMetrics {
                execution_time_ms: envelope.get("Execution Time").and_then(as_f64),
                estimated_cost: node.get("Total Cost").and_then(as_f64),
                actual_rows: node.get("Actual Rows").and_then(as_u64),
                estimated_rows: node.get("Plan Rows").and_then(as_u64),
            })
        }
        RawPlan::Object(map) => {
            let query_block = map
                .get("query_block")
                .and_then(Value::as_object)
                .ok_or(MetricsError::UnrecognizedShape("object without query_block"))?;

            Ok(PerformanceMetrics {
                estimated_cost: query_block
                    .get("cost_info")
                    .and_then(|info| info.get("query_cost"))
                    .and_then(as_f64),
                ..PerformanceMetrics::default()
            })
        }
        RawPlan::Text(text) => Ok(PerformanceMetrics {
            execution_time_ms: actual_time_end(text)?,
            ..PerformanceMetrics::default()
        }),
    }
}

/// End of the first `actual time=start..end` range in a text plan.
fn actual_time_end(text: &str) -> Result<Option<f64>, MetricsError> {
    const MARKER: &str = "actual time=";

    let Some(pos) = text.find(MARKER) else {
        return Ok(None);
    };
    let range: String = text[pos + MARKER.len()..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let end = range
        .split_once("..")
        .map(|(_, end)| end)
        .and_then(parse_time_ms)
        .ok_or_else(|| MetricsError::InvalidTiming(range.clone()))?;
    Ok(Some(end))
}

fn parse_time_ms(s: &str) -> Option<f64> {
    let s = s.trim().trim_end_matches("ms").trim();
    s.parse::<f64>().ok()
}

// MySQL reports costs as strings ("query_cost": "1.20").
fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Normalized view of one plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanAnalysis {
    pub query_type: QueryType,
    pub plan_summary: String,
    /// `None` when the plan shape carries no recognizable metrics;
    /// `Some` with unset fields when it carries only some of them.
    pub metrics: Option<PerformanceMetrics>,
}

pub fn parse_execution_plan(sql: &str, plan: &RawPlan) -> PlanAnalysis {
    let metrics = match extract_metrics(plan) {
        Ok(metrics) => Some(metrics),
        Err(e) => {
            tracing::debug!("no metrics extracted: {}", e);
            None
        }
    };

    PlanAnalysis {
        query_type: detect_query_type(sql),
        plan_summary: plan.summary(),
        metrics,
    }
}

pub fn format_duration_ms(ms: f64) -> String {
    if ms >= 1000.0 {
        format!("{:.2}s", ms / 1000.0)
    } else {
        format!("{:.2}ms", ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_detect_query_type() {
        assert_eq!(detect_query_type("  select * from t"), QueryType::Select);
        assert_eq!(detect_query_type("INSERT INTO t VALUES (1)"), QueryType::Insert);
        assert_eq!(detect_query_type("update t set a = 1"), QueryType::Update);
        assert_eq!(detect_query_type("DELETE FROM t"), QueryType::Delete);
        assert_eq!(detect_query_type("DROP TABLE t"), QueryType::Ddl);
        assert_eq!(detect_query_type("create index i on t (a)"), QueryType::Ddl);
        assert_eq!(detect_query_type("ALTER TABLE t ADD c int"), QueryType::Ddl);
        assert_eq!(detect_query_type("desc t"), QueryType::System);
        assert_eq!(detect_query_type("DESCRIBE t"), QueryType::System);
        assert_eq!(detect_query_type("show tables"), QueryType::System);
        assert_eq!(detect_query_type("MERGE INTO t USING s ON ..."), QueryType::Other);
        assert_eq!(detect_query_type("WITH x AS (SELECT 1) SELECT * FROM x"), QueryType::Other);
    }

    #[test]
    fn test_is_explain_query() {
        assert!(is_explain_query("EXPLAIN SELECT 1"));
        assert!(is_explain_query("  explain analyze select * from t"));
        assert!(!is_explain_query("SELECT * FROM explain_table"));
    }

    #[test]
    fn test_postgres_metrics() {
        let plan = RawPlan::Array(vec![json!({
            "Execution Time": 12.3,
            "Plan": {"Actual Rows": 5, "Plan Rows": 10, "Total Cost": 1.5}
        })]);
        let metrics = extract_metrics(&plan).unwrap();
        assert_eq!(
            metrics,
            PerformanceMetrics {
                execution_time_ms: Some(12.3),
                estimated_cost: Some(1.5),
                actual_rows: Some(5),
                estimated_rows: Some(10),
            }
        );
    }

    #[test]
    fn test_postgres_metrics_without_analyze() {
        let plan = RawPlan::Array(vec![json!({
            "Plan": {"Node Type": "Seq Scan", "Plan Rows": 2550, "Total Cost": 35.5}
        })]);
        let metrics = extract_metrics(&plan).unwrap();
        assert_eq!(metrics.execution_time_ms, None);
        assert_eq!(metrics.actual_rows, None);
        assert_eq!(metrics.estimated_rows, Some(2550));
        assert_eq!(metrics.estimated_cost, Some(35.5));
    }

    #[test]
    fn test_mysql_metrics() {
        let plan = RawPlan::Object(
            json!({"query_block": {"select_id": 1, "cost_info": {"query_cost": "1.20"}}})
                .as_object()
                .unwrap()
                .clone(),
        );
        let metrics = extract_metrics(&plan).unwrap();
        assert_eq!(metrics.estimated_cost, Some(1.2));
        assert_eq!(metrics.execution_time_ms, None);
    }

    #[test]
    fn test_mysql_metrics_without_cost_info() {
        let plan = RawPlan::Object(
            json!({"query_block": {"select_id": 1}})
                .as_object()
                .unwrap()
                .clone(),
        );
        let metrics = extract_metrics(&plan).unwrap();
        assert!(metrics.is_empty());
    }

    #[test]
    fn test_text_metrics() {
        let plan = RawPlan::Text(
            "Seq Scan on users  (cost=0.00..35.50 rows=100 width=36) (actual time=0.01..3.42 rows=100 loops=1)"
                .to_string(),
        );
        let metrics = extract_metrics(&plan).unwrap();
        assert_eq!(metrics.execution_time_ms, Some(3.42));
        assert_eq!(metrics.estimated_cost, None);
    }

    #[test]
    fn test_text_metrics_at_end_of_input() {
        let plan = RawPlan::Text("Expression (actual time=0.5..7".to_string());
        assert_eq!(extract_metrics(&plan).unwrap().execution_time_ms, Some(7.0));
    }

    #[test]
    fn test_text_without_timing_is_empty() {
        let plan = RawPlan::Text("SCAN users".to_string());
        let metrics = extract_metrics(&plan).unwrap();
        assert!(metrics.is_empty());
    }

    #[test]
    fn test_text_with_broken_timing() {
        let plan = RawPlan::Text("actual time=abc".to_string());
        assert_eq!(
            extract_metrics(&plan),
            Err(MetricsError::InvalidTiming(String::new()))
        );
    }

    #[test]
    fn test_unrecognized_shapes() {
        let rows = RawPlan::Array(vec![json!({"id": 1, "select_type": "SIMPLE"})]);
        assert!(matches!(
            extract_metrics(&rows),
            Err(MetricsError::UnrecognizedShape(_))
        ));
        assert!(extract_metrics(&RawPlan::Array(vec![])).is_err());
        assert!(extract_metrics(&RawPlan::Object(Map::new())).is_err());
    }

    #[test]
    fn test_from_rows_native_json_cell() {
        let rows = vec![row(&[("QUERY PLAN", json!([{"Plan": {"Total Cost": 1.0}}]))])];
        let plan = RawPlan::from_rows(&rows);
        assert!(matches!(plan, RawPlan::Array(ref items) if items.len() == 1));
    }

    #[test]
    fn test_from_rows_json_text_cell() {
        let rows = vec![row(&[("EXPLAIN", json!("{\"query_block\": {\"select_id\": 1}}"))])];
        let plan = RawPlan::from_rows(&rows);
        assert!(matches!(plan, RawPlan::Object(ref map) if map.contains_key("query_block")));
    }

    #[test]
    fn test_from_rows_text_lines() {
        let rows = vec![
            row(&[("explain", json!("Expression ((Projection + Before ORDER BY))"))]),
            row(&[("explain", json!("  ReadFromMergeTree (default.events)"))]),
        ];
        let plan = RawPlan::from_rows(&rows);
        assert_eq!(
            plan,
            RawPlan::Text(
                "Expression ((Projection + Before ORDER BY))\n  ReadFromMergeTree (default.events)"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_from_rows_tabular() {
        let rows = vec![
            row(&[("id", json!(2)), ("parent", json!(0)), ("detail", json!("SCAN users"))]),
            row(&[("id", json!(3)), ("parent", json!(0)), ("detail", json!("USE TEMP B-TREE"))]),
        ];
        let plan = RawPlan::from_rows(&rows);
        let RawPlan::Array(items) = &plan else {
            panic!("expected array plan, got {:?}", plan);
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["detail"], "SCAN users");
    }

    #[test]
    fn test_summary_shapes() {
        assert_eq!(RawPlan::Text("Seq Scan".into()).summary(), "Seq Scan");

        let array = RawPlan::Array(vec![json!({"a": 1}), json!({"b": 2})]);
        assert_eq!(array.summary(), "{\"a\":1}\n{\"b\":2}");

        let object = RawPlan::Object(json!({"a": 1}).as_object().unwrap().clone());
        assert_eq!(object.summary(), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_parse_execution_plan() {
        let plan = RawPlan::Array(vec![json!({"Execution Time": 0.4, "Plan": {}})]);
        let analysis = parse_execution_plan("SELECT 1", &plan);
        assert_eq!(analysis.query_type, QueryType::Select);
        assert_eq!(analysis.metrics.unwrap().execution_time_ms, Some(0.4));
        assert!(analysis.plan_summary.contains("Execution Time"));
    }

    #[test]
    fn test_parse_execution_plan_without_metrics() {
        let plan = RawPlan::Array(vec![json!({"id": 1})]);
        let analysis = parse_execution_plan("show tables", &plan);
        assert_eq!(analysis.query_type, QueryType::System);
        assert!(analysis.metrics.is_none());
        assert_eq!(analysis.plan_summary, "{\"id\":1}");
    }

    #[test]
    fn test_metrics_serialize_camel_case() {
        let metrics = PerformanceMetrics {
            execution_time_ms: Some(3.42),
            ..PerformanceMetrics::default()
        };
        let value = serde_json::to_value(&metrics).unwrap();
        assert_eq!(value, json!({"executionTimeMs": 3.42}));
    }

    #[test]
    fn test_format_duration_ms() {
        assert_eq!(format_duration_ms(0.5), "0.50ms");
        assert_eq!(format_duration_ms(1500.0), "1.50s");
    }
}
