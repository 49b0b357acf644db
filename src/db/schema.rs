use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio_postgres::Client;

/// Schema snapshot handed to prompt formatting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    /// Database or schema name, if known
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub tables: Vec<TableSchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    pub name: String,
    /// Storage engine (MySQL `InnoDB`, ClickHouse `MergeTree`, ...)
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub columns: Vec<ColumnSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
}

fn default_nullable() -> bool {
    true
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Introspect tables, columns and primary keys of one PostgreSQL schema.
pub async fn load_postgres_schema(client: &Client, schema: &str) -> Result<DatabaseSchema> {
    let rows = client
        .query(
            r#"
            SELECT
                c.table_name,
                c.column_name,
                c.data_type,
                c.is_nullable = 'YES' as is_nullable,
                c.column_default,
                COALESCE(tc.constraint_type = 'PRIMARY KEY', false) as is_primary_key
            FROM information_schema.columns c
            JOIN information_schema.tables t
                ON t.table_schema = c.table_schema
                AND t.table_name = c.table_name
                AND t.table_type = 'BASE TABLE'
            LEFT JOIN information_schema.key_column_usage kcu
                ON c.table_schema = kcu.table_schema
                AND c.table_name = kcu.table_name
                AND c.column_name = kcu.column_name
            LEFT JOIN information_schema.table_constraints tc
                ON kcu.constraint_name = tc.constraint_name
                AND kcu.table_schema = tc.table_schema
                AND tc.constraint_type = 'PRIMARY KEY'
            WHERE c.table_schema = $1
            ORDER BY c.table_name, c.ordinal_position
            "#,
            &[&schema],
        )
        .await?;

    let mut tables: Vec<TableSchema> = Vec::new();
    for row in &rows {
        let table_name: String = row.get("table_name");
        if tables.last().map(|t| t.name != table_name).unwrap_or(true) {
            tables.push(TableSchema {
                name: table_name,
                ..TableSchema::default()
            });
        }
        let Some(table) = tables.last_mut() else {
            continue;
        };

        let column_name: String = row.get("column_name");
        let is_primary_key: bool = row.get("is_primary_key");
        if is_primary_key && !table.primary_key.contains(&column_name) {
            table.primary_key.push(column_name.clone());
        }
        // A column can appear twice when it takes part in several key constraints.
        if table.columns.iter().any(|c| c.name == column_name) {
            continue;
        }
        table.columns.push(ColumnSchema {
            name: column_name,
            data_type: row.get("data_type"),
            nullable: row.get("is_nullable"),
            default: row.get("column_default"),
        });
    }

    Ok(DatabaseSchema {
        database: Some(schema.to_string()),
        tables,
    })
}
