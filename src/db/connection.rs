use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_postgres::{Client, NoTls};

use super::adapter::{DatabaseAdapter, DatabaseManager};
use super::postgres::PostgresBackend;
use super::query::QueryResult;
use crate::dialect::{normalize_dialect, Dialect};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub name: String,
    /// Declared SQL dialect of the server, e.g. `postgresql`.
    #[serde(default = "default_dialect")]
    pub dialect: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
}

fn default_dialect() -> String {
    Dialect::PostgreSql.id().to_string()
}

impl ConnectionConfig {
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} dbname={} user={} password={} connect_timeout=10",
            quote_conn_value(&self.host),
            self.port,
            quote_conn_value(&self.database),
            quote_conn_value(&self.username),
            quote_conn_value(&self.password),
        )
    }

    pub fn display_string(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.username, self.host, self.port, self.database
        )
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            name: String::from("Local PostgreSQL"),
            dialect: default_dialect(),
            host: String::from("localhost"),
            port: 5432,
            database: String::from("postgres"),
            username: String::from("postgres"),
            password: String::new(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SavedConnections {
    #[serde(default)]
    connections: Vec<ConnectionConfig>,
}

/// A registered connection: its declared dialect and the backend that
/// executes statements for it.
#[derive(Clone)]
struct ConnectionEntry {
    dialect: String,
    backend: Arc<dyn DatabaseAdapter>,
}

/// Maps connection ids to backends and their declared dialect.
#[derive(Default)]
pub struct ConnectionManager {
    connections: RwLock<HashMap<String, ConnectionEntry>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a connection. The dialect id is normalized.
    pub async fn register(
        &self,
        connection_id: impl Into<String>,
        dialect: &str,
        backend: Arc<dyn DatabaseAdapter>,
    ) {
        let entry = ConnectionEntry {
            dialect: normalize_dialect(dialect),
            backend,
        };
        self.connections
            .write()
            .await
            .insert(connection_id.into(), entry);
    }

    pub async fn remove(&self, connection_id: &str) -> bool {
        self.connections.write().await.remove(connection_id).is_some()
    }

    pub async fn is_connected(&self, connection_id: &str) -> bool {
        self.connections.read().await.contains_key(connection_id)
    }

    /// Backend registered for a connection, for callers that need the
    /// adapter capability (e.g. the pagination builder).
    pub async fn adapter(&self, connection_id: &str) -> Option<Arc<dyn DatabaseAdapter>> {
        self.connections
            .read()
            .await
            .get(connection_id)
            .map(|entry| entry.backend.clone())
    }

    /// Open a PostgreSQL connection and register it under `config.name`.
    pub async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<PostgresBackend>> {
        let client = create_client(config).await?;
        let backend = Arc::new(PostgresBackend::new(client));
        self.register(config.name.clone(), &config.dialect, backend.clone())
            .await;
        tracing::info!(connection = %config.name, "connected to {}", config.display_string());
        Ok(backend)
    }

    pub fn get_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("querylens")
            .join("connections.toml")
    }

    pub fn load_saved_connections() -> Result<Vec<ConnectionConfig>> {
        let path = Self::get_config_path();
        if !path.exists() {
            return Ok(vec![]);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        parse_saved_connections(&content)
    }
}

fn parse_saved_connections(content: &str) -> Result<Vec<ConnectionConfig>> {
    let saved: SavedConnections =
        toml::from_str(content).context("Invalid saved connections file")?;
    Ok(saved.connections)
}

#[async_trait]
impl DatabaseManager for ConnectionManager {
    async fn query(
        &self,
        connection_id: &str,
        sql: &str,
        session_id: Option<&str>,
    ) -> Result<QueryResult> {
        let Some(backend) = self.adapter(connection_id).await else {
            return Ok(QueryResult::failure(format!(
                "No active connection with id '{}'",
                connection_id
            )));
        };
        backend.query(connection_id, sql, session_id).await
    }

    async fn connection_dialect(&self, connection_id: &str) -> Option<String> {
        self.connections
            .read()
            .await
            .get(connection_id)
            .map(|entry| entry.dialect.clone())
    }
}

/// Create a PostgreSQL client. The connection task is spawned onto the
/// current tokio runtime.
pub async fn create_client(config: &ConnectionConfig) -> Result<Client> {
    let conn_string = config.connection_string();
    let timeout = Duration::from_secs(15);

    let (client, connection) =
        tokio::time::timeout(timeout, tokio_postgres::connect(&conn_string, NoTls))
            .await
            .map_err(|_| anyhow::anyhow!("Connection timed out after 15s"))?
            .context("Failed to connect to PostgreSQL")?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("connection error: {}", e);
        }
    });

    Ok(client)
}

/// Quote a value for use in a libpq key=value connection string.
fn quote_conn_value(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}
