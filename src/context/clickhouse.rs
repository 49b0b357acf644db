use super::{
    pairs, strings, DatabaseContext, DatabaseContextProvider, ExampleSet, FeatureSupport,
    FunctionMap,
};

/// ClickHouse knowledge. Column-oriented, so most guidance is about
/// avoiding row-store habits: no sequences, `count()`, MergeTree engines.
pub struct ClickHouseContext {
    context: DatabaseContext,
}

impl Default for ClickHouseContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ClickHouseContext {
    pub fn new() -> Self {
        let functions = FunctionMap {
            random: strings(&[
                "rand()",
                "rand64()",
                "randUniform(min, max)",
                "generateUUIDv4()",
            ]),
            date_time: strings(&[
                "now()",
                "today()",
                "toDate(ts)",
                "toDateTime(s)",
                "toStartOfDay(ts)",
                "toStartOfMonth(ts)",
                "dateDiff('day', a, b)",
                "addDays(ts, 1)",
            ]),
            aggregation: strings(&[
                "count()",
                "sum(x)",
                "avg(x)",
                "uniq(x)",
                "uniqExact(x)",
                "quantile(0.95)(x)",
                "groupArray(x)",
                "argMax(v, ts)",
            ]),
            string: strings(&["concat(a, b)", "lower(s)", "upper(s)", "substring(s, 1, 3)"]),
            sequence: strings(&["rowNumberInAllBlocks()", "number (from numbers(N))"]),
            custom: pairs(&[
                ("numbers(N)", "table function yielding 0..N-1 in column `number`"),
                ("arrayJoin(arr)", "unnest an array into rows"),
            ]),
        };

        let examples = ExampleSet {
            random_data: strings(&[
                "INSERT INTO events (id, user_id, value, ts)\nSELECT number, rand() % 1000, randUniform(0, 100), now() - toIntervalSecond(rand() % 86400)\nFROM numbers(1000);",
            ]),
            incremental_ids: strings(&[
                "SELECT rowNumberInAllBlocks() + 1 AS id, name FROM staging_users;",
            ]),
            joins: strings(&[
                "SELECT e.user_id, u.name, count() AS events\nFROM events AS e\nINNER JOIN users AS u ON u.id = e.user_id\nGROUP BY e.user_id, u.name;",
            ]),
            aggregations: strings(&[
                "SELECT toStartOfHour(ts) AS hour, count(), uniq(user_id)\nFROM events\nGROUP BY hour\nORDER BY hour;",
            ]),
            date_filtering: strings(&["SELECT * FROM events WHERE ts >= now() - INTERVAL 1 DAY;"]),
            custom: pairs(&[(
                "Table creation",
                strings(&[
                    "CREATE TABLE events (\n    id UInt64,\n    user_id UInt32,\n    value Float64,\n    ts DateTime\n) ENGINE = MergeTree\nORDER BY (user_id, ts);",
                ]),
            )]),
        };

        let context = DatabaseContext {
            id: "clickhouse".to_string(),
            name: "ClickHouse".to_string(),
            description: "Column-oriented OLAP database for analytical queries over large volumes".to_string(),
            functions,
            examples,
            data_types: strings(&[
                "UInt8", "UInt32", "UInt64", "Int32", "Int64", "Float32", "Float64",
                "Decimal(p, s)", "String", "FixedString(n)", "Date", "DateTime", "DateTime64(3)",
                "UUID", "Array(T)", "Map(K, V)", "Nullable(T)", "LowCardinality(String)",
            ]),
            query_patterns: pairs(&[
                ("pagination", "SELECT * FROM t ORDER BY id LIMIT 50 OFFSET 100"),
                ("latest_per_key", "SELECT key, argMax(value, ts) FROM t GROUP BY key"),
            ]),
            best_practices: strings(&[
                "Every MergeTree table needs an ORDER BY key",
                "Insert in large batches rather than row by row",
                "Wrap columns in Nullable(T) only when NULL is really needed",
            ]),
            features: FeatureSupport {
                window_functions: true,
                common_table_expressions: true,
                json: true,
                arrays: true,
                full_text_search: false,
                upsert: false,
                returning: false,
                custom: pairs(&[("Materialized Views", true), ("Transactions", false)]),
            },
            critical_warnings: Some(strings(&[
                "Use rand() for random numbers, never RANDOM() or RAND()",
                "Use now() and today() for current time",
                "Use toDate()/toDateTime() for conversions",
                "There is no AUTO_INCREMENT or SERIAL: use numbers(N), rowNumberInAllBlocks() or generateUUIDv4()",
                "Use count() instead of COUNT(*)",
                "UPDATE and DELETE are ALTER TABLE ... UPDATE/DELETE mutations",
            ])),
        };

        Self { context }
    }
}

impl DatabaseContextProvider for ClickHouseContext {
    fn context(&self) -> &DatabaseContext {
        &self.context
    }
}
