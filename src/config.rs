use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::explain::ExplainConfig;

pub const DEFAULT_ROW_LIMIT: u64 = 1000;

/// User settings from `<config_dir>/querylens/config.toml`.
///
/// ```toml
/// default_row_limit = 500
///
/// [explain]
/// postgresql = "EXPLAIN (ANALYZE, BUFFERS, FORMAT JSON)"
/// snowflake = "EXPLAIN USING JSON"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Dialect id -> EXPLAIN prefix, layered over the built-in prefixes
    pub explain: BTreeMap<String, String>,
    pub default_row_limit: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            explain: BTreeMap::new(),
            default_row_limit: DEFAULT_ROW_LIMIT,
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("querylens")
            .join("config.toml")
    }

    /// Load settings, falling back to defaults when the file is absent.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid settings in {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Write every `[explain]` override into `config`. Stops at the first
    /// rejected entry.
    pub fn apply_explain_overrides(&self, config: &mut ExplainConfig) -> Result<()> {
        for (dialect, prefix) in &self.explain {
            config
                .update(dialect, prefix)
                .with_context(|| format!("Invalid [explain] entry for '{}'", dialect))?;
            tracing::debug!(dialect = %dialect, prefix = %prefix, "EXPLAIN prefix overridden");
        }
        Ok(())
    }
}
