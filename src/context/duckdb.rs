use super::{
    pairs, strings, DatabaseContext, DatabaseContextProvider, ExampleSet, FeatureSupport,
    FunctionMap,
};

pub struct DuckDbContext {
    context: DatabaseContext,
}

impl Default for DuckDbContext {
    fn default() -> Self {
        Self::new()
    }
}

impl DuckDbContext {
    pub fn new() -> Self {
        let functions = FunctionMap {
            random: strings(&["random()", "uuid()", "setseed(0.5)"]),
            date_time: strings(&[
                "now()",
                "current_date",
                "date_trunc('day', ts)",
                "date_diff('day', a, b)",
                "strftime(ts, '%Y-%m-%d')",
                "ts + INTERVAL 1 DAY",
            ]),
            aggregation: strings(&[
                "count(*)",
                "sum(x)",
                "avg(x)",
                "median(x)",
                "quantile_cont(x, 0.9)",
                "list(x)",
                "string_agg(s, ',')",
                "arg_max(v, ts)",
            ]),
            string: strings(&["a || b", "concat(a, b)", "lower(s)", "upper(s)", "regexp_matches(s, p)"]),
            sequence: strings(&[
                "CREATE SEQUENCE seq_id",
                "nextval('seq_id')",
                "range(1, 101)",
                "generate_series(1, 100)",
            ]),
            custom: pairs(&[
                ("read_csv_auto('file.csv')", "query a CSV file as a table"),
                ("read_parquet('file.parquet')", "query a Parquet file as a table"),
            ]),
        };

        let examples = ExampleSet {
            random_data: strings(&[
                "INSERT INTO users (id, name, age)\nSELECT i, 'user_' || i, 18 + CAST(random() * 60 AS INTEGER)\nFROM range(1, 101) t(i);",
            ]),
            incremental_ids: strings(&[
                "CREATE SEQUENCE order_ids START 1;\nCREATE TABLE orders (\n    id BIGINT PRIMARY KEY DEFAULT nextval('order_ids'),\n    created_at TIMESTAMP DEFAULT current_timestamp\n);",
            ]),
            joins: strings(&[
                "SELECT u.name, count(o.id) AS order_count\nFROM users u\nLEFT JOIN orders o ON o.user_id = u.id\nGROUP BY ALL;",
            ]),
            aggregations: strings(&[
                "SELECT date_trunc('month', created_at) AS month, sum(total)\nFROM orders\nGROUP BY ALL\nORDER BY ALL;",
            ]),
            date_filtering: strings(&[
                "SELECT * FROM orders WHERE created_at >= now() - INTERVAL 7 DAY;",
            ]),
            custom: Default::default(),
        };

        let context = DatabaseContext {
            id: "duckdb".to_string(),
            name: "DuckDB".to_string(),
            description: "In-process analytical database with PostgreSQL-flavored SQL".to_string(),
            functions,
            examples,
            data_types: strings(&[
                "INTEGER", "BIGINT", "HUGEINT", "DOUBLE", "DECIMAL(p, s)", "VARCHAR", "BOOLEAN",
                "DATE", "TIMESTAMP", "INTERVAL", "UUID", "LIST", "STRUCT", "MAP", "JSON",
            ]),
            query_patterns: pairs(&[
                ("pagination", "SELECT * FROM t ORDER BY id LIMIT 50 OFFSET 100"),
                ("upsert", "INSERT OR REPLACE INTO t (id, v) VALUES (1, 'x')"),
            ]),
            best_practices: strings(&[
                "Use GROUP BY ALL and ORDER BY ALL instead of repeating columns",
                "Read files directly with read_csv_auto/read_parquet instead of staging tables",
            ]),
            features: FeatureSupport {
                window_functions: true,
                common_table_expressions: true,
                json: true,
                arrays: true,
                full_text_search: false,
                upsert: true,
                returning: true,
                custom: Default::default(),
            },
            critical_warnings: None,
        };

        Self { context }
    }
}

impl DatabaseContextProvider for DuckDbContext {
    fn context(&self) -> &DatabaseContext {
        &self.context
    }
}
