//! Load config from a JSON file or the environment, and resolve catalog relations into the registry.

use crate::catalog::RawRelation;
use crate::config::resolved::{Registry, TableDescriptor, TableKind};
use crate::config::types::*;
use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::Path;

/// Merge catalog relations with model overrides. Pure and total: unmatched relations get default policy.
pub fn build_registry(relations: &[RawRelation], overrides: &[ModelOverride]) -> Registry {
    let overrides_by_name: HashMap<&str, &ModelOverride> = overrides
        .iter()
        .rev()
        .map(|o| (o.table_name.as_str(), o))
        .collect();

    let tables = relations
        .iter()
        .map(|rel| {
            let found = overrides_by_name.get(rel.name.as_str());
            let kind = TableKind::from_catalog(&rel.kind);
            let alias = found
                .and_then(|o| o.alias.as_deref())
                .map(str::trim)
                .unwrap_or("")
                .to_string();
            let access = match kind {
                TableKind::View => Access::only([Verb::Read]),
                TableKind::Table => found.and_then(|o| o.access.clone()).unwrap_or_default(),
            };
            TableDescriptor {
                name: rel.name.clone(),
                schema: rel.schema.clone(),
                kind,
                primary_key: rel.primary_key.clone(),
                alias,
                access,
            }
        })
        .collect();
    Registry::new(tables)
}

impl GlobalConfig {
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
    }

    /// Build config from `LAZYREST_*` variables, reading a `.env` file first when present.
    pub async fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let mut connection = ConnectionConfig::default();
        if let Some(host) = var("LAZYREST_DB_HOST") {
            connection.host = host;
        }
        if let Some(port) = var("LAZYREST_DB_PORT") {
            connection.port = parse_number("LAZYREST_DB_PORT", &port)?;
        }
        if let Some(user) = var("LAZYREST_DB_USER") {
            connection.user = user;
        }
        if let Some(password) = var("LAZYREST_DB_PASSWORD") {
            connection.password = password;
        }
        if let Some(database) = var("LAZYREST_DB_NAME") {
            connection.database = database;
        }
        if let Some(schema) = var("LAZYREST_DB_SCHEMA") {
            connection.schema = schema;
        }
        if let Some(max) = var("LAZYREST_MAX_CONNECTIONS") {
            connection.max_connections = parse_number("LAZYREST_MAX_CONNECTIONS", &max)?;
        }

        let mut config = GlobalConfig::new(connection);
        if let Some(hidden) = var("LAZYREST_HIDDEN_TABLES") {
            config.hidden_tables = split_list(&hidden);
        }
        if let Some(path) = var("LAZYREST_MODELS") {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| ConfigError::Load(format!("{}: {}", path, e)))?;
            config.models = serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path, e)))?;
        }
        if let Some(prefix) = var("LAZYREST_PREFIX") {
            config.prefix = prefix;
        }
        if let Some(lifetime) = var("LAZYREST_LIFETIME") {
            config.lifetime = parse_number("LAZYREST_LIFETIME", &lifetime)?;
        }
        if let Some(verbose) = var("LAZYREST_VERBOSE") {
            config.verbose = is_truthy(&verbose);
        }
        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Load(format!("{} must be a number, got '{}'", name, value)))
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// "true" and "1" enable; everything else disables.
pub fn is_truthy(s: &str) -> bool {
    let s = s.trim();
    s.eq_ignore_ascii_case("true") || s == "1"
}
