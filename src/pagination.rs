//! Paginated table browsing.
//!
//! One shared `FROM <table> [WHERE ...]` fragment feeds both the data query
//! and the companion count query, so the total always describes exactly
//! the population the page was drawn from.
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::{DatabaseAdapter, OrderSpec, QueryResult, Row, SqlFormatter, TableFilter};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationOptions {
    #[serde(default)]
    pub filters: Vec<TableFilter>,
    #[serde(default)]
    pub order_by: Vec<OrderSpec>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
}

impl PaginationOptions {
    pub fn is_paginated(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }
}

/// SQL text produced for one paginated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginatedQueries {
    pub data_query: String,
    /// Present only when a limit or offset was requested.
    pub count_query: Option<String>,
}

/// Render the data query and, when paginating, the count query.
///
/// `table` is used verbatim: it is expected to be qualified and quoted by
/// the caller. Column names in ORDER BY go through the formatter.
pub fn build_queries<F>(formatter: &F, options: &PaginationOptions, table: &str) -> PaginatedQueries
where
    F: SqlFormatter + ?Sized,
{
    let mut shared = format!("FROM {}", table);

    let predicates: Vec<String> = options
        .filters
        .iter()
        .map(|filter| formatter.build_where_clause(filter))
        .filter(|fragment| !fragment.trim().is_empty())
        .collect();
    if !predicates.is_empty() {
        shared.push_str(" WHERE ");
        shared.push_str(&predicates.join(" AND "));
    }

    let mut data_query = format!("SELECT * {}", shared);

    if !options.order_by.is_empty() {
        let order: Vec<String> = options
            .order_by
            .iter()
            .map(|spec| {
                format!(
                    "{} {}",
                    formatter.escape_identifier(&spec.column),
                    spec.direction.as_sql()
                )
            })
            .collect();
        data_query.push_str(" ORDER BY ");
        data_query.push_str(&order.join(", "));
    }
    if let Some(limit) = options.limit {
        data_query.push_str(&format!(" LIMIT {}", limit));
    }
    if let Some(offset) = options.offset {
        data_query.push_str(&format!(" OFFSET {}", offset));
    }

    let count_query = options.is_paginated().then(|| {
        let count_expr = formatter
            .count_expression()
            .unwrap_or_else(|| "COUNT(*)".to_string());
        format!("SELECT {} AS total {}", count_expr, shared)
    });

    PaginatedQueries {
        data_query,
        count_query,
    }
}

pub struct PaginationQueryBuilder {
    adapter: Arc<dyn DatabaseAdapter>,
}

impl PaginationQueryBuilder {
    pub fn new(adapter: Arc<dyn DatabaseAdapter>) -> Self {
        Self { adapter }
    }

    /// Fetch one page of `table`.
    ///
    /// The count query runs only after a successful data query, and its
    /// failure is never fatal: the page is returned with `total_rows` and
    /// `has_more` left unset.
    pub async fn build_paginated_query(
        &self,
        connection_id: &str,
        options: &PaginationOptions,
        table: &str,
        session_id: Option<&str>,
    ) -> QueryResult {
        let queries = build_queries(self.adapter.as_ref(), options, table);
        tracing::debug!(sql = %queries.data_query, "paginated data query");

        let mut result = match self
            .adapter
            .query(connection_id, &queries.data_query, session_id)
            .await
        {
            Ok(result) => result,
            Err(e) => return QueryResult::failure(e.to_string()),
        };

        if !result.success {
            return result;
        }
        let Some(count_query) = queries.count_query else {
            return result;
        };

        match self.fetch_total(connection_id, &count_query, session_id).await {
            Ok(total) => {
                let offset = options.offset.unwrap_or(0);
                result.total_rows = Some(total);
                let seen = offset.saturating_add(result.row_count() as u64);
                result.has_more = Some(seen < total);
            }
            Err(e) => {
                tracing::warn!(table = %table, "count query failed, total unknown: {:#}", e);
            }
        }

        result
    }

    async fn fetch_total(
        &self,
        connection_id: &str,
        count_query: &str,
        session_id: Option<&str>,
    ) -> anyhow::Result<u64> {
        let result = self
            .adapter
            .query(connection_id, count_query, session_id)
            .await?;
        if !result.success {
            anyhow::bail!(result.error_message());
        }
        result
            .data
            .first()
            .and_then(total_from_row)
            .ok_or_else(|| anyhow::anyhow!("count query returned no readable total"))
    }
}

fn total_from_row(row: &Row) -> Option<u64> {
    let value = row.get("total").or_else(|| row.values().next())?;
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        // MySQL and ClickHouse drivers commonly hand big integers back as text.
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Append `LIMIT <limit>` to a row-returning statement that has none.
///
/// Any LIMIT the user wrote is kept as is, whether it is smaller or larger
/// than `limit`. Statements that do not start with SELECT or WITH are
/// returned unchanged.
pub fn apply_default_limit(sql: &str, limit: u64) -> String {
    let trimmed = sql.trim().trim_end_matches(';').trim_end();
    let upper = trimmed.to_uppercase();

    if !(upper.starts_with("SELECT") || upper.starts_with("WITH")) {
        return sql.to_string();
    }
    let has_limit = upper
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .any(|word| word == "LIMIT" || word == "FETCH");
    if has_limit {
        return sql.to_string();
    }

    format!("{} LIMIT {}", trimmed, limit)
}
