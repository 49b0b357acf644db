//! Per-dialect knowledge used to brief an LLM before it writes SQL.
//!
//! A dialect only supplies data (`DatabaseContext`); every provider shares
//! the same schema and prompt formatting through the default methods of
//! `DatabaseContextProvider`.
mod clickhouse;
mod default;
mod duckdb;
mod mysql;
mod postgres;
pub mod registry;
mod sqlite;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::db::DatabaseSchema;

pub use clickhouse::ClickHouseContext;
pub use default::DefaultContext;
pub use duckdb::DuckDbContext;
pub use mysql::MySqlContext;
pub use postgres::PostgresContext;
pub use registry::{
    context_provider, register_context_provider, supported_context_types,
    DatabaseContextRegistry,
};
pub use sqlite::SqliteContext;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FunctionMap {
    pub random: Vec<String>,
    pub date_time: Vec<String>,
    pub aggregation: Vec<String>,
    pub string: Vec<String>,
    pub sequence: Vec<String>,
    /// Function signature -> what it does
    pub custom: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExampleSet {
    pub random_data: Vec<String>,
    pub incremental_ids: Vec<String>,
    pub joins: Vec<String>,
    pub aggregations: Vec<String>,
    pub date_filtering: Vec<String>,
    /// Category label -> example statements
    pub custom: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureSupport {
    pub window_functions: bool,
    pub common_table_expressions: bool,
    pub json: bool,
    pub arrays: bool,
    pub full_text_search: bool,
    pub upsert: bool,
    pub returning: bool,
    pub custom: BTreeMap<String, bool>,
}

impl FeatureSupport {
    /// The fixed flags, in prompt order.
    pub fn flags(&self) -> [(&'static str, bool); 7] {
        [
            ("Window Functions", self.window_functions),
            ("Common Table Expressions (WITH)", self.common_table_expressions),
            ("JSON Support", self.json),
            ("Array Types", self.arrays),
            ("Full-Text Search", self.full_text_search),
            ("UPSERT", self.upsert),
            ("RETURNING Clause", self.returning),
        ]
    }
}

/// Static knowledge about one SQL dialect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseContext {
    /// Normalized dialect id, e.g. `postgresql`
    pub id: String,
    /// Display name, e.g. `PostgreSQL`
    pub name: String,
    pub description: String,
    pub functions: FunctionMap,
    pub examples: ExampleSet,
    pub data_types: Vec<String>,
    /// Pattern name -> SQL template
    pub query_patterns: BTreeMap<String, String>,
    pub best_practices: Vec<String>,
    pub features: FeatureSupport,
    pub critical_warnings: Option<Vec<String>>,
}

pub trait DatabaseContextProvider: Send + Sync {
    fn context(&self) -> &DatabaseContext;

    fn format_schema(&self, schema: &DatabaseSchema) -> String {
        format_schema(self.context(), schema)
    }

    fn generate_prompt_instructions(&self) -> String {
        generate_prompt_instructions(self.context())
    }
}

/// A bare context is its own provider, which lets callers register
/// knowledge loaded from JSON or TOML.
impl DatabaseContextProvider for DatabaseContext {
    fn context(&self) -> &DatabaseContext {
        self
    }
}

pub(crate) fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub(crate) fn pairs<V, W>(items: &[(&str, V)]) -> BTreeMap<String, W>
where
    V: Clone,
    W: From<V>,
{
    items
        .iter()
        .map(|(k, v)| (k.to_string(), W::from(v.clone())))
        .collect()
}

/// Render a schema as plain text under a database header.
pub fn format_schema(context: &DatabaseContext, schema: &DatabaseSchema) -> String {
    let mut out = String::new();
    out.push_str(&format!("Database: {}\n", context.name));
    if !context.description.is_empty() {
        out.push_str(&format!("Description: {}\n", context.description));
    }
    if let Some(database) = &schema.database {
        out.push_str(&format!("Schema: {}\n", database));
    }

    for table in &schema.tables {
        out.push_str(&format!("\nTable: {}\n", table.name));
        if let Some(engine) = &table.engine {
            out.push_str(&format!("  Engine: {}\n", engine));
        }
        if !table.primary_key.is_empty() {
            out.push_str(&format!("  Primary Key: {}\n", table.primary_key.join(", ")));
        }
        out.push_str("  Columns:\n");
        for column in &table.columns {
            let nullability = if column.nullable { "NULL" } else { "NOT NULL" };
            out.push_str(&format!(
                "    - {}: {} {}",
                column.name, column.data_type, nullability
            ));
            if let Some(default) = &column.default {
                out.push_str(&format!(" DEFAULT {}", default));
            }
            out.push('\n');
        }
    }

    out
}

// Warnings that predate per-dialect declarations. Only ClickHouse ever had any.
fn legacy_critical_warnings(dialect_id: &str) -> &'static [&'static str] {
    match dialect_id {
        "clickhouse" => &[
            "Use rand() for random numbers, never RANDOM() or RAND()",
            "Use now() and today(), not CURRENT_TIMESTAMP arithmetic",
            "Use toDate()/toDateTime() for conversions instead of CAST(... AS DATE)",
            "There is no AUTO_INCREMENT or SERIAL: generate ids with rowNumberInAllBlocks() or generateUUIDv4()",
            "Use count() instead of COUNT(*) for row counts",
        ],
        _ => &[],
    }
}

fn generic_warnings(name: &str) -> [String; 3] {
    [
        format!("Use the exact function names listed for {}", name),
        "Never mix syntax from other SQL dialects".to_string(),
        "Follow the examples exactly when generating similar queries".to_string(),
    ]
}

fn bullet_section(title: &str, lines: &[String]) -> Option<String> {
    if lines.is_empty() {
        return None;
    }
    let body: Vec<String> = lines.iter().map(|line| format!("- {}", line)).collect();
    Some(format!("{}:\n{}", title, body.join("\n")))
}

fn warnings_section(context: &DatabaseContext) -> Option<String> {
    let mut lines: Vec<String> = match &context.critical_warnings {
        Some(declared) if !declared.is_empty() => declared.clone(),
        _ => strings(legacy_critical_warnings(&context.id)),
    };
    lines.extend(generic_warnings(&context.name));
    bullet_section("CRITICAL SYNTAX RULES", &lines)
}

fn functions_section(functions: &FunctionMap) -> Option<String> {
    let groups = [
        ("Random values", &functions.random),
        ("Date/time", &functions.date_time),
        ("Aggregation", &functions.aggregation),
        ("Sequences and IDs", &functions.sequence),
    ];
    let mut lines: Vec<String> = groups
        .iter()
        .filter(|(_, names)| !names.is_empty())
        .map(|(label, names)| format!("{}: {}", label, names.join(", ")))
        .collect();
    lines.extend(
        functions
            .custom
            .iter()
            .map(|(signature, description)| format!("{}: {}", signature, description)),
    );
    bullet_section("ESSENTIAL FUNCTIONS", &lines)
}

fn examples_section(examples: &ExampleSet) -> Option<String> {
    let mut picked: Vec<(&str, &String)> = Vec::new();
    let fixed = [
        ("Random data", &examples.random_data),
        ("Incremental IDs", &examples.incremental_ids),
        ("Joins", &examples.joins),
    ];
    for (label, list) in fixed {
        if let Some(first) = list.first() {
            picked.push((label, first));
        }
    }
    for (label, list) in &examples.custom {
        if let Some(first) = list.first() {
            picked.push((label.as_str(), first));
        }
    }

    if picked.is_empty() {
        return None;
    }
    let body: Vec<String> = picked
        .iter()
        .map(|(label, sql)| format!("{}:\n{}", label, sql))
        .collect();
    Some(format!("KEY EXAMPLES:\n{}", body.join("\n\n")))
}

fn best_practices_section(context: &DatabaseContext) -> Option<String> {
    let mut lines = context.best_practices.clone();
    lines.extend(
        context
            .query_patterns
            .iter()
            .map(|(name, template)| format!("{} pattern: {}", name, template)),
    );
    bullet_section("BEST PRACTICES", &lines)
}

fn features_section(features: &FeatureSupport) -> Option<String> {
    let support = |on: bool| if on { "Supported" } else { "Not Supported" };
    let mut lines: Vec<String> = features
        .flags()
        .iter()
        .map(|(label, on)| format!("{}: {}", label, support(*on)))
        .collect();
    lines.extend(
        features
            .custom
            .iter()
            .map(|(label, on)| format!("{}: {}", label, support(*on))),
    );
    bullet_section("FEATURE SUPPORT", &lines)
}

/// Assemble the LLM instruction block for one dialect.
///
/// Section order is fixed: banner, critical syntax rules, functions,
/// examples, best practices, feature support. A section with nothing to
/// say is left out entirely.
pub fn generate_prompt_instructions(context: &DatabaseContext) -> String {
    let mut banner = format!("=== {} SQL GENERATION GUIDE ===", context.name.to_uppercase());
    if !context.description.is_empty() {
        banner.push('\n');
        banner.push_str(&context.description);
    }

    let sections = [
        Some(banner),
        warnings_section(context),
        functions_section(&context.functions),
        examples_section(&context.examples),
        best_practices_section(context),
        features_section(&context.features),
    ];
    sections.into_iter().flatten().collect::<Vec<_>>().join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ColumnSchema, TableSchema};
    use pretty_assertions::assert_eq;

    fn bare_context(id: &str, name: &str) -> DatabaseContext {
        DatabaseContext {
            id: id.to_string(),
            name: name.to_string(),
            ..DatabaseContext::default()
        }
    }

    #[test]
    fn test_minimal_prompt_omits_empty_sections() {
        let prompt = generate_prompt_instructions(&bare_context("oracle", "Oracle"));
        assert_eq!(
            prompt,
            "=== ORACLE SQL GENERATION GUIDE ===\n\
             \n\
             CRITICAL SYNTAX RULES:\n\
             - Use the exact function names listed for Oracle\n\
             - Never mix syntax from other SQL dialects\n\
             - Follow the examples exactly when generating similar queries\n\
             \n\
             FEATURE SUPPORT:\n\
             - Window Functions: Not Supported\n\
             - Common Table Expressions (WITH): Not Supported\n\
             - JSON Support: Not Supported\n\
             - Array Types: Not Supported\n\
             - Full-Text Search: Not Supported\n\
             - UPSERT: Not Supported\n\
             - RETURNING Clause: Not Supported"
        );
        assert!(!prompt.contains("ESSENTIAL FUNCTIONS"));
        assert!(!prompt.contains("KEY EXAMPLES"));
        assert!(!prompt.contains("BEST PRACTICES"));
    }

    #[test]
    fn test_string_functions_alone_do_not_open_functions_section() {
        let mut context = bare_context("x", "X");
        context.functions.string = strings(&["UPPER()"]);
        let prompt = generate_prompt_instructions(&context);
        assert!(!prompt.contains("ESSENTIAL FUNCTIONS"));
    }

    #[test]
    fn test_declared_warnings_replace_legacy_list() {
        let mut context = bare_context("clickhouse", "ClickHouse");
        context.critical_warnings = Some(strings(&["Only use ClickHouse syntax"]));
        let prompt = generate_prompt_instructions(&context);
        assert!(prompt.contains("- Only use ClickHouse syntax"));
        assert!(!prompt.contains("never RANDOM()"));
        assert!(prompt.contains("- Never mix syntax from other SQL dialects"));
    }

    #[test]
    fn test_legacy_warnings_apply_without_declared_list() {
        let context = bare_context("clickhouse", "ClickHouse");
        let prompt = generate_prompt_instructions(&context);
        assert!(prompt.contains("- Use rand() for random numbers, never RANDOM() or RAND()"));
        assert!(prompt.contains("- Follow the examples exactly when generating similar queries"));

        let mut empty_declared = bare_context("clickhouse", "ClickHouse");
        empty_declared.critical_warnings = Some(vec![]);
        assert!(generate_prompt_instructions(&empty_declared).contains("never RANDOM()"));

        let other = bare_context("mysql", "MySQL");
        assert!(!generate_prompt_instructions(&other).contains("never RANDOM()"));
    }

    #[test]
    fn test_examples_show_first_of_each_category() {
        let mut context = bare_context("x", "X");
        context.examples.random_data = strings(&["SELECT 'first random'", "SELECT 'second random'"]);
        context.examples.joins = strings(&["SELECT 'first join'"]);
        context.examples.aggregations = strings(&["SELECT 'aggregation'"]);
        context
            .examples
            .custom
            .insert("Time series".to_string(), strings(&["SELECT 'ts 1'", "SELECT 'ts 2'"]));

        let prompt = generate_prompt_instructions(&context);
        assert!(prompt.contains("KEY EXAMPLES:\nRandom data:\nSELECT 'first random'"));
        assert!(!prompt.contains("second random"));
        assert!(prompt.contains("Joins:\nSELECT 'first join'"));
        assert!(!prompt.contains("Incremental IDs"));
        assert!(!prompt.contains("'aggregation'"));
        assert!(prompt.contains("Time series:\nSELECT 'ts 1'"));
        assert!(!prompt.contains("ts 2"));
    }

    #[test]
    fn test_functions_and_features_sections() {
        let mut context = bare_context("x", "X");
        context.functions.random = strings(&["RANDOM()"]);
        context.functions.sequence = strings(&["nextval('seq')"]);
        context
            .functions
            .custom
            .insert("gen_random_uuid()".into(), "random UUID v4".into());
        context.features.window_functions = true;
        context.features.custom.insert("Materialized Views".into(), true);

        let prompt = generate_prompt_instructions(&context);
        assert!(prompt.contains(
            "ESSENTIAL FUNCTIONS:\n- Random values: RANDOM()\n- Sequences and IDs: nextval('seq')\n- gen_random_uuid(): random UUID v4"
        ));
        assert!(prompt.contains("- Window Functions: Supported"));
        assert!(prompt.ends_with("- Materialized Views: Supported"));
    }

    #[test]
    fn test_builtin_providers_are_populated() {
        let providers: Vec<Box<dyn DatabaseContextProvider>> = vec![
            Box::new(PostgresContext::new()),
            Box::new(MySqlContext::new()),
            Box::new(ClickHouseContext::new()),
            Box::new(SqliteContext::new()),
            Box::new(DuckDbContext::new()),
            Box::new(DefaultContext::new()),
        ];
        for provider in &providers {
            let context = provider.context();
            assert!(!context.name.is_empty());
            assert!(!context.query_patterns.is_empty(), "{}", context.id);
            assert!(!context.best_practices.is_empty(), "{}", context.id);
            assert!(context.query_patterns.values().all(|t| !t.trim().is_empty()));

            let prompt = provider.generate_prompt_instructions();
            assert!(prompt.starts_with(&format!(
                "=== {} SQL GENERATION GUIDE ===",
                context.name.to_uppercase()
            )));
            assert!(prompt.contains("BEST PRACTICES:"));
        }

        let custom: BTreeMap<String, String> = pairs(&[("a()", "does a")]);
        assert_eq!(custom.get("a()").map(String::as_str), Some("does a"));
    }

    #[test]
    fn test_section_order() {
        let prompt = PostgresContext::new().generate_prompt_instructions();
        let positions: Vec<usize> = [
            "=== POSTGRESQL SQL GENERATION GUIDE ===",
            "CRITICAL SYNTAX RULES:",
            "ESSENTIAL FUNCTIONS:",
            "KEY EXAMPLES:",
            "BEST PRACTICES:",
            "FEATURE SUPPORT:",
        ]
        .iter()
        .map(|marker| prompt.find(marker).expect(marker))
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_format_schema() {
        let mut context = bare_context("mysql", "MySQL");
        context.description = "Relational database".to_string();
        let schema = DatabaseSchema {
            database: Some("shop".to_string()),
            tables: vec![
                TableSchema {
                    name: "orders".to_string(),
                    engine: Some("InnoDB".to_string()),
                    primary_key: vec!["id".to_string()],
                    columns: vec![
                        ColumnSchema::new("id", "bigint", false),
                        ColumnSchema::new("status", "varchar(20)", true).with_default("'new'"),
                    ],
                },
                TableSchema {
                    name: "notes".to_string(),
                    engine: None,
                    primary_key: vec![],
                    columns: vec![ColumnSchema::new("body", "text", true)],
                },
            ],
        };

        assert_eq!(
            format_schema(&context, &schema),
            "Database: MySQL\n\
             Description: Relational database\n\
             Schema: shop\n\
             \n\
             Table: orders\n  \
               Engine: InnoDB\n  \
               Primary Key: id\n  \
               Columns:\n    \
                 - id: bigint NOT NULL\n    \
                 - status: varchar(20) NULL DEFAULT 'new'\n\
             \n\
             Table: notes\n  \
               Columns:\n    \
                 - body: text NULL\n"
        );
    }

    #[test]
    fn test_context_deserializes_as_provider() {
        let context: DatabaseContext = serde_json::from_value(serde_json::json!({
            "id": "snowflake",
            "name": "Snowflake",
            "functions": {"random": ["RANDOM()", "UNIFORM(1, 10, RANDOM())"]},
            "features": {"windowFunctions": true}
        }))
        .unwrap();
        let prompt = context.generate_prompt_instructions();
        assert!(prompt.contains("- Random values: RANDOM(), UNIFORM(1, 10, RANDOM())"));
        assert!(prompt.contains("- Window Functions: Supported"));
        assert!(context.critical_warnings.is_none());
    }
}
