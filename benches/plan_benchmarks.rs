//! Benchmarks for the per-request, CPU-bound parts of querylens:
//! - EXPLAIN result normalization (rows → RawPlan → metrics)
//! - Pagination SQL rendering
//! - LLM prompt assembly
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Map, Value};

use querylens::context::context_provider;
use querylens::db::{FilterOperator, OrderSpec, TableFilter};
use querylens::dialect::Dialect;
use querylens::explain::{extract_metrics, parse_execution_plan, RawPlan};
use querylens::pagination::{build_queries, PaginationOptions};

// ---------------------------------------------------------------------------
// EXPLAIN outputs as the backends return them
// ---------------------------------------------------------------------------

const SQL: &str = "SELECT u.name, o.total FROM users u JOIN orders o ON u.id = o.user_id \
    WHERE o.total > 100 ORDER BY o.created_at DESC LIMIT 50";

const TEXT_PLAN: &[&str] = &[
    "Limit  (cost=0.29..8.31 rows=1 width=40) (actual time=0.012..0.013 rows=1 loops=1)",
    "  ->  Nested Loop  (cost=0.29..8.31 rows=1 width=40) (actual time=0.011..0.012 rows=1 loops=1)",
    "        ->  Index Scan using orders_pkey on orders o  (cost=0.15..8.17 rows=1 width=16) (actual time=0.005..0.006 rows=1 loops=1)",
    "              Index Cond: (total > 100)",
    "        ->  Index Scan using users_pkey on users u  (cost=0.14..0.16 rows=1 width=36) (actual time=0.003..0.003 rows=1 loops=1)",
    "Planning Time: 0.210 ms",
    "Execution Time: 0.045 ms",
];

fn row(column: &str, value: Value) -> Map<String, Value> {
    let mut row = Map::new();
    row.insert(column.to_string(), value);
    row
}

fn postgres_rows() -> Vec<Map<String, Value>> {
    vec![row(
        "QUERY PLAN",
        json!([{
            "Plan": {
                "Node Type": "Limit",
                "Total Cost": 8.31,
                "Plan Rows": 1,
                "Actual Rows": 1,
                "Plans": [{"Node Type": "Nested Loop", "Total Cost": 8.31}]
            },
            "Planning Time": 0.21,
            "Execution Time": 0.045
        }]),
    )]
}

fn mysql_rows() -> Vec<Map<String, Value>> {
    let doc = json!({
        "query_block": {
            "select_id": 1,
            "cost_info": {"query_cost": "12.40"},
            "nested_loop": [
                {"table": {"table_name": "o", "rows_examined_per_scan": 120}},
                {"table": {"table_name": "u", "rows_examined_per_scan": 1}}
            ]
        }
    });
    vec![row("EXPLAIN", Value::String(doc.to_string()))]
}

fn text_rows() -> Vec<Map<String, Value>> {
    TEXT_PLAN
        .iter()
        .map(|line| row("QUERY PLAN", Value::String(line.to_string())))
        .collect()
}

fn bench_plan_normalization(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan");

    let cases = [
        ("postgres_json", postgres_rows()),
        ("mysql_json_text", mysql_rows()),
        ("text", text_rows()),
    ];

    for (name, rows) in &cases {
        group.bench_with_input(BenchmarkId::new("from_rows", name), rows, |b, rows| {
            b.iter(|| RawPlan::from_rows(black_box(rows)));
        });

        let plan = RawPlan::from_rows(rows);
        group.bench_with_input(BenchmarkId::new("extract_metrics", name), &plan, |b, plan| {
            b.iter(|| extract_metrics(black_box(plan)));
        });
        group.bench_with_input(BenchmarkId::new("parse_execution_plan", name), &plan, |b, plan| {
            b.iter(|| parse_execution_plan(black_box(SQL), black_box(plan)));
        });
    }

    group.finish();
}

fn bench_pagination(c: &mut Criterion) {
    let mut group = c.benchmark_group("pagination");

    let options = PaginationOptions {
        filters: vec![
            TableFilter::new("status", FilterOperator::Eq, json!("active")),
            TableFilter::new("age", FilterOperator::Gte, json!(21)),
            TableFilter::new("country", FilterOperator::In, json!(["DE", "FR", "NL"])),
            TableFilter::new("deleted_at", FilterOperator::IsNull, Value::Null),
        ],
        order_by: vec![OrderSpec::desc("created_at"), OrderSpec::asc("id")],
        limit: Some(50),
        offset: Some(100),
    };

    for dialect in [Dialect::PostgreSql, Dialect::MySql, Dialect::ClickHouse] {
        group.bench_with_input(
            BenchmarkId::new("build_queries", dialect.id()),
            &dialect,
            |b, dialect| {
                b.iter(|| build_queries(dialect, black_box(&options), "public.users"));
            },
        );
    }

    group.finish();
}

fn bench_prompt(c: &mut Criterion) {
    let mut group = c.benchmark_group("prompt");

    for dialect in Dialect::ALL {
        let provider = context_provider(dialect.id());
        group.bench_function(BenchmarkId::new("generate", dialect.id()), |b| {
            b.iter(|| provider.generate_prompt_instructions());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_plan_normalization, bench_pagination, bench_prompt);
criterion_main!(benches);
