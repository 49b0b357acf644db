use super::{
    pairs, strings, DatabaseContext, DatabaseContextProvider, ExampleSet, FeatureSupport,
    FunctionMap,
};

pub struct MySqlContext {
    context: DatabaseContext,
}

impl Default for MySqlContext {
    fn default() -> Self {
        Self::new()
    }
}

impl MySqlContext {
    pub fn new() -> Self {
        let functions = FunctionMap {
            random: strings(&["RAND()", "UUID()", "FLOOR(RAND() * 100)"]),
            date_time: strings(&[
                "NOW()",
                "CURDATE()",
                "DATE_FORMAT(ts, '%Y-%m-%d')",
                "DATE_SUB(NOW(), INTERVAL 7 DAY)",
                "TIMESTAMPDIFF(SECOND, a, b)",
                "UNIX_TIMESTAMP(ts)",
            ]),
            aggregation: strings(&[
                "COUNT(*)",
                "SUM(x)",
                "AVG(x)",
                "MIN(x)",
                "MAX(x)",
                "GROUP_CONCAT(x SEPARATOR ',')",
                "JSON_ARRAYAGG(x)",
            ]),
            string: strings(&[
                "CONCAT(a, b)",
                "CONCAT_WS(',', a, b)",
                "LOWER(s)",
                "UPPER(s)",
                "SUBSTRING(s, 1, 3)",
            ]),
            sequence: strings(&["AUTO_INCREMENT", "LAST_INSERT_ID()"]),
            custom: pairs(&[("ROW_NUMBER() OVER (...)", "window row numbering, MySQL 8.0+")]),
        };

        let examples = ExampleSet {
            random_data: strings(&[
                "INSERT INTO users (name, age)\nSELECT CONCAT('user_', n), FLOOR(18 + RAND() * 60)\nFROM (SELECT 1 AS n UNION ALL SELECT 2 UNION ALL SELECT 3) AS seq;",
            ]),
            incremental_ids: strings(&[
                "CREATE TABLE orders (\n    id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,\n    created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP\n) ENGINE=InnoDB;",
            ]),
            joins: strings(&[
                "SELECT u.name, COUNT(o.id) AS order_count\nFROM users u\nLEFT JOIN orders o ON o.user_id = u.id\nGROUP BY u.name;",
            ]),
            aggregations: strings(&[
                "SELECT DATE_FORMAT(created_at, '%Y-%m') AS month, SUM(total)\nFROM orders\nGROUP BY month;",
            ]),
            date_filtering: strings(&[
                "SELECT * FROM orders WHERE created_at >= DATE_SUB(NOW(), INTERVAL 7 DAY);",
            ]),
            custom: Default::default(),
        };

        let context = DatabaseContext {
            id: "mysql".to_string(),
            name: "MySQL".to_string(),
            description: "Widely deployed relational database, also covering MariaDB".to_string(),
            functions,
            examples,
            data_types: strings(&[
                "TINYINT", "INT", "BIGINT", "DECIMAL(p, s)", "FLOAT", "DOUBLE", "VARCHAR(n)",
                "TEXT", "DATE", "DATETIME", "TIMESTAMP", "JSON", "BLOB", "ENUM(...)",
            ]),
            query_patterns: pairs(&[
                ("pagination", "SELECT * FROM t ORDER BY id LIMIT 50 OFFSET 100"),
                ("upsert", "INSERT INTO t (id, v) VALUES (1, 'x') ON DUPLICATE KEY UPDATE v = VALUES(v)"),
            ]),
            best_practices: strings(&[
                "Quote identifiers with backticks, not double quotes",
                "Prefer InnoDB tables for transactions and foreign keys",
                "Use utf8mb4 for text columns",
            ]),
            features: FeatureSupport {
                window_functions: true,
                common_table_expressions: true,
                json: true,
                arrays: false,
                full_text_search: true,
                upsert: true,
                returning: false,
                custom: Default::default(),
            },
            critical_warnings: Some(strings(&[
                "Use RAND(), never RANDOM()",
                "Use AUTO_INCREMENT, never SERIAL or IDENTITY",
                "There is no RETURNING clause: read ids with LAST_INSERT_ID()",
            ])),
        };

        Self { context }
    }
}

impl DatabaseContextProvider for MySqlContext {
    fn context(&self) -> &DatabaseContext {
        &self.context
    }
}
