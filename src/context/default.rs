use super::{
    pairs, strings, DatabaseContext, DatabaseContextProvider, ExampleSet, FeatureSupport,
    FunctionMap,
};

/// Generic ANSI SQL guidance for dialects without their own provider.
pub struct DefaultContext {
    context: DatabaseContext,
}

impl Default for DefaultContext {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultContext {
    pub fn new() -> Self {
        let functions = FunctionMap {
            random: Vec::new(),
            date_time: strings(&["CURRENT_DATE", "CURRENT_TIMESTAMP"]),
            aggregation: strings(&["COUNT(*)", "SUM(x)", "AVG(x)", "MIN(x)", "MAX(x)"]),
            string: strings(&["UPPER(s)", "LOWER(s)", "TRIM(s)"]),
            sequence: Vec::new(),
            custom: Default::default(),
        };

        let examples = ExampleSet {
            joins: strings(&[
                "SELECT u.name, COUNT(o.id) AS order_count\nFROM users u\nLEFT JOIN orders o ON o.user_id = u.id\nGROUP BY u.name;",
            ]),
            aggregations: strings(&["SELECT status, COUNT(*) FROM orders GROUP BY status;"]),
            ..ExampleSet::default()
        };

        let context = DatabaseContext {
            id: "default".to_string(),
            name: "Generic SQL".to_string(),
            description: "Portable ANSI SQL for an unidentified database".to_string(),
            functions,
            examples,
            data_types: strings(&["INTEGER", "DECIMAL(p, s)", "VARCHAR(n)", "DATE", "TIMESTAMP"]),
            query_patterns: pairs(&[("filtering", "SELECT * FROM t WHERE col = 'value'")]),
            best_practices: strings(&[
                "Stick to ANSI SQL constructs",
                "Avoid vendor-specific functions unless the database is known",
            ]),
            features: FeatureSupport::default(),
            critical_warnings: None,
        };

        Self { context }
    }
}

impl DatabaseContextProvider for DefaultContext {
    fn context(&self) -> &DatabaseContext {
        &self.context
    }
}
