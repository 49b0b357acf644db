use super::{
    pairs, strings, DatabaseContext, DatabaseContextProvider, ExampleSet, FeatureSupport,
    FunctionMap,
};

/// PostgreSQL knowledge: SERIAL/IDENTITY ids, `RANDOM()`, `generate_series`.
pub struct PostgresContext {
    context: DatabaseContext,
}

impl Default for PostgresContext {
    fn default() -> Self {
        Self::new()
    }
}

impl PostgresContext {
    pub fn new() -> Self {
        let functions = FunctionMap {
            random: strings(&["RANDOM()", "gen_random_uuid()", "setseed(0.5)"]),
            date_time: strings(&[
                "NOW()",
                "CURRENT_DATE",
                "CURRENT_TIMESTAMP",
                "DATE_TRUNC('day', ts)",
                "EXTRACT(EPOCH FROM ts)",
                "AGE(ts1, ts2)",
                "ts + INTERVAL '1 day'",
            ]),
            aggregation: strings(&[
                "COUNT(*)",
                "SUM(x)",
                "AVG(x)",
                "MIN(x)",
                "MAX(x)",
                "STRING_AGG(text, ',')",
                "ARRAY_AGG(x)",
                "PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY x)",
            ]),
            string: strings(&[
                "CONCAT(a, b)",
                "a || b",
                "LOWER(s)",
                "UPPER(s)",
                "SUBSTRING(s FROM 1 FOR 3)",
                "REGEXP_REPLACE(s, pattern, replacement)",
            ]),
            sequence: strings(&[
                "SERIAL / BIGSERIAL",
                "GENERATED ALWAYS AS IDENTITY",
                "nextval('seq_name')",
                "generate_series(1, 100)",
            ]),
            custom: pairs(&[
                ("md5(text)", "hex MD5 digest, handy for random-looking strings"),
                ("jsonb_build_object(k, v, ...)", "build a JSONB object"),
            ]),
        };

        let examples = ExampleSet {
            random_data: strings(&[
                "INSERT INTO users (name, email, age)\nSELECT 'user_' || g, 'user_' || g || '@example.com', (RANDOM() * 60 + 18)::int\nFROM generate_series(1, 100) AS g;",
                "SELECT * FROM products ORDER BY RANDOM() LIMIT 5;",
            ]),
            incremental_ids: strings(&[
                "CREATE TABLE orders (\n    id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,\n    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()\n);",
            ]),
            joins: strings(&[
                "SELECT u.name, COUNT(o.id) AS order_count\nFROM users u\nLEFT JOIN orders o ON o.user_id = u.id\nGROUP BY u.name;",
            ]),
            aggregations: strings(&[
                "SELECT DATE_TRUNC('month', created_at) AS month, SUM(total)\nFROM orders\nGROUP BY 1\nORDER BY 1;",
            ]),
            date_filtering: strings(&[
                "SELECT * FROM orders WHERE created_at >= NOW() - INTERVAL '7 days';",
            ]),
            custom: Default::default(),
        };

        let context = DatabaseContext {
            id: "postgresql".to_string(),
            name: "PostgreSQL".to_string(),
            description: "Open-source object-relational database with strict typing and rich SQL support".to_string(),
            functions,
            examples,
            data_types: strings(&[
                "SMALLINT", "INTEGER", "BIGINT", "NUMERIC(p, s)", "REAL", "DOUBLE PRECISION",
                "TEXT", "VARCHAR(n)", "BOOLEAN", "DATE", "TIMESTAMP", "TIMESTAMPTZ", "INTERVAL",
                "UUID", "JSON", "JSONB", "BYTEA", "ARRAY",
            ]),
            query_patterns: pairs(&[
                ("pagination", "SELECT * FROM t ORDER BY id LIMIT 50 OFFSET 100"),
                ("upsert", "INSERT INTO t (id, v) VALUES (1, 'x') ON CONFLICT (id) DO UPDATE SET v = EXCLUDED.v"),
                ("top_n_per_group", "SELECT * FROM (SELECT *, ROW_NUMBER() OVER (PARTITION BY g ORDER BY v DESC) AS rn FROM t) s WHERE rn <= 3"),
            ]),
            best_practices: strings(&[
                "Quote identifiers with double quotes only when they are mixed-case or reserved",
                "Cast explicitly with ::type when mixing numeric and text values",
                "Use RETURNING to read back generated ids instead of a second SELECT",
            ]),
            features: FeatureSupport {
                window_functions: true,
                common_table_expressions: true,
                json: true,
                arrays: true,
                full_text_search: true,
                upsert: true,
                returning: true,
                custom: pairs(&[("Materialized Views", true)]),
            },
            critical_warnings: Some(strings(&[
                "Use RANDOM(), never RAND()",
                "Use SERIAL or GENERATED AS IDENTITY, never AUTO_INCREMENT",
                "String literals take single quotes; double quotes are identifiers",
                "Use LIMIT/OFFSET, not TOP",
            ])),
        };

        Self { context }
    }
}

impl DatabaseContextProvider for PostgresContext {
    fn context(&self) -> &DatabaseContext {
        &self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_mentions_postgres_specifics() {
        let prompt = PostgresContext::new().generate_prompt_instructions();
        assert!(prompt.starts_with("=== POSTGRESQL SQL GENERATION GUIDE ==="));
        assert!(prompt.contains("- Use RANDOM(), never RAND()"));
        assert!(prompt.contains("generate_series(1, 100)"));
        assert!(prompt.contains("- RETURNING Clause: Supported"));
        assert!(prompt.contains("- Materialized Views: Supported"));
        // only the first random-data example is shown
        assert!(!prompt.contains("ORDER BY RANDOM() LIMIT 5"));
    }
}
