//! Configuration for explore compilation.
//!
//! Supports TOML-based configuration with global defaults and per-explore overrides.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dialect::DialectKind;
use crate::error::{ExploreError, Result};
use crate::query::QueryLimit;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ExploreConfig {
    /// Global defaults applied to all explores unless overridden.
    pub defaults: GlobalDefaults,

    /// Per-explore configuration overrides (keyed by explore name).
    #[serde(default)]
    pub explores: HashMap<String, ExploreOverrides>,
}

/// Global default settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalDefaults {
    /// Warehouse dialect explores are compiled for (default: postgres).
    pub dialect: DialectKind,
    pub query: QueryConfig,
}

/// Query assembly configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Maximum rows a query may return (0 = unlimited).
    pub max_row_limit: u64,
}

/// Per-explore configuration (can override globals).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ExploreOverrides {
    pub dialect: Option<DialectKind>,
    pub query: Option<QueryConfig>,
}

impl Default for GlobalDefaults {
    fn default() -> Self {
        Self {
            dialect: DialectKind::Postgres,
            query: QueryConfig::default(),
        }
    }
}

impl QueryConfig {
    /// Apply `max_row_limit`: finite limits are clamped and "all rows"
    /// becomes the maximum. Unlimited configs pass the limit through.
    pub fn effective_limit(&self, limit: QueryLimit) -> Option<u64> {
        match (limit, self.max_row_limit) {
            (limit, 0) => limit.into(),
            (QueryLimit::Rows(n), max) => Some(n.min(max)),
            (QueryLimit::All, max) => Some(max),
        }
    }
}

impl ExploreConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ExploreError::Config(format!("failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| ExploreError::Config(format!("failed to parse config: {e}")))
    }

    /// Load from default locations (env var, cwd, user config dir, or defaults).
    ///
    /// Search order:
    /// 1. `EXPLORE_CONFIG` environment variable
    /// 2. `./explore.toml` (current directory)
    /// 3. `~/.config/explore/config.toml` (user config dir)
    /// 4. Built-in defaults
    pub fn load_default() -> Self {
        if let Ok(path) = std::env::var("EXPLORE_CONFIG") {
            if let Ok(cfg) = Self::from_file(&path) {
                tracing::info!(path = %path, "loaded config from EXPLORE_CONFIG");
                return cfg;
            }
        }

        if let Ok(cfg) = Self::from_file("explore.toml") {
            tracing::info!("loaded config from ./explore.toml");
            return cfg;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("explore").join("config.toml");
            if let Ok(cfg) = Self::from_file(&user_config) {
                tracing::info!(path = %user_config.display(), "loaded config from user config dir");
                return cfg;
            }
        }

        tracing::debug!("no config file found, using defaults");
        Self::default()
    }

    /// Get resolved config for a specific explore (merges global defaults).
    pub fn for_explore(&self, name: &str) -> ResolvedExploreConfig {
        ResolvedExploreConfig::merge(&self.defaults, self.explores.get(name))
    }
}

/// Fully resolved configuration for an explore (no Option fields).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedExploreConfig {
    pub dialect: DialectKind,
    pub query: QueryConfig,
}

impl ResolvedExploreConfig {
    fn merge(defaults: &GlobalDefaults, override_cfg: Option<&ExploreOverrides>) -> Self {
        match override_cfg {
            Some(ex) => Self {
                dialect: ex.dialect.unwrap_or(defaults.dialect),
                query: ex.query.clone().unwrap_or_else(|| defaults.query.clone()),
            },
            None => Self {
                dialect: defaults.dialect,
                query: defaults.query.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = ExploreConfig::default();
        assert_eq!(cfg.defaults.dialect, DialectKind::Postgres);
        assert_eq!(cfg.defaults.query.max_row_limit, 0);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[defaults]
dialect = "duckdb"

[defaults.query]
max_row_limit = 50000

[explores.orders]
dialect = "bigquery"
"#;
        let cfg = ExploreConfig::from_toml(toml).unwrap();
        assert_eq!(cfg.defaults.dialect, DialectKind::DuckDb);
        assert_eq!(cfg.defaults.query.max_row_limit, 50_000);

        let resolved = cfg.for_explore("orders");
        assert_eq!(resolved.dialect, DialectKind::BigQuery);
        assert_eq!(resolved.query.max_row_limit, 50_000);
    }

    #[test]
    fn test_explore_override() {
        let toml = r#"
[defaults.query]
max_row_limit = 100

[explores.big.query]
max_row_limit = 5000
"#;
        let cfg = ExploreConfig::from_toml(toml).unwrap();

        let default_resolved = cfg.for_explore("unknown");
        assert_eq!(default_resolved.query.max_row_limit, 100);
        assert_eq!(default_resolved.dialect, DialectKind::Postgres);

        let big_resolved = cfg.for_explore("big");
        assert_eq!(big_resolved.query.max_row_limit, 5000);
    }

    #[test]
    fn test_unknown_dialect_is_rejected() {
        let err = ExploreConfig::from_toml("[defaults]\ndialect = \"oracle\"\n").unwrap_err();
        assert!(matches!(err, ExploreError::Config(_)));
    }

    #[test]
    fn test_row_limit_clamping() {
        let unlimited = QueryConfig::default();
        assert_eq!(unlimited.effective_limit(QueryLimit::All), None);
        assert_eq!(unlimited.effective_limit(QueryLimit::Rows(10)), Some(10));

        let capped = QueryConfig { max_row_limit: 500 };
        assert_eq!(capped.effective_limit(QueryLimit::All), Some(500));
        assert_eq!(capped.effective_limit(QueryLimit::Rows(10)), Some(10));
        assert_eq!(capped.effective_limit(QueryLimit::Rows(9000)), Some(500));
    }
}
