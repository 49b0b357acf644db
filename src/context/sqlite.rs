use super::{
    pairs, strings, DatabaseContext, DatabaseContextProvider, ExampleSet, FeatureSupport,
    FunctionMap,
};

pub struct SqliteContext {
    context: DatabaseContext,
}

impl Default for SqliteContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SqliteContext {
    pub fn new() -> Self {
        let functions = FunctionMap {
            random: strings(&["random()", "abs(random()) % 100", "randomblob(16)"]),
            date_time: strings(&[
                "datetime('now')",
                "date('now')",
                "strftime('%Y-%m', ts)",
                "julianday(a) - julianday(b)",
                "datetime('now', '-7 days')",
            ]),
            aggregation: strings(&[
                "COUNT(*)",
                "SUM(x)",
                "AVG(x)",
                "MIN(x)",
                "MAX(x)",
                "group_concat(x, ',')",
            ]),
            string: strings(&["a || b", "lower(s)", "upper(s)", "substr(s, 1, 3)", "trim(s)"]),
            sequence: strings(&["INTEGER PRIMARY KEY", "last_insert_rowid()"]),
            custom: Default::default(),
        };

        let examples = ExampleSet {
            random_data: strings(&[
                "WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < 100)\nINSERT INTO users (name, age)\nSELECT 'user_' || n, 18 + abs(random()) % 60 FROM seq;",
            ]),
            incremental_ids: strings(&[
                "CREATE TABLE orders (\n    id INTEGER PRIMARY KEY,\n    created_at TEXT NOT NULL DEFAULT (datetime('now'))\n);",
            ]),
            joins: strings(&[
                "SELECT u.name, COUNT(o.id) AS order_count\nFROM users u\nLEFT JOIN orders o ON o.user_id = u.id\nGROUP BY u.name;",
            ]),
            aggregations: strings(&[
                "SELECT strftime('%Y-%m', created_at) AS month, SUM(total)\nFROM orders\nGROUP BY month;",
            ]),
            date_filtering: strings(&[
                "SELECT * FROM orders WHERE created_at >= datetime('now', '-7 days');",
            ]),
            custom: Default::default(),
        };

        let context = DatabaseContext {
            id: "sqlite".to_string(),
            name: "SQLite".to_string(),
            description: "Embedded single-file database with dynamic typing".to_string(),
            functions,
            examples,
            data_types: strings(&["INTEGER", "REAL", "TEXT", "BLOB", "NUMERIC"]),
            query_patterns: pairs(&[
                ("pagination", "SELECT * FROM t ORDER BY id LIMIT 50 OFFSET 100"),
                ("upsert", "INSERT INTO t (id, v) VALUES (1, 'x') ON CONFLICT(id) DO UPDATE SET v = excluded.v"),
            ]),
            best_practices: strings(&[
                "Dates are stored as ISO-8601 TEXT; compare them as strings",
                "Wrap bulk inserts in a single transaction",
            ]),
            features: FeatureSupport {
                window_functions: true,
                common_table_expressions: true,
                json: true,
                arrays: false,
                full_text_search: true,
                upsert: true,
                returning: true,
                custom: Default::default(),
            },
            critical_warnings: Some(strings(&[
                "There is no NOW(): use datetime('now')",
                "There is no AUTO_INCREMENT keyword: INTEGER PRIMARY KEY is the rowid",
                "ALTER TABLE cannot drop constraints or change column types",
            ])),
        };

        Self { context }
    }
}

impl DatabaseContextProvider for SqliteContext {
    fn context(&self) -> &DatabaseContext {
        &self.context
    }
}
