//! Config validation: required connection parameters and route prefix normalization.

use crate::config::GlobalConfig;
use crate::error::ConfigError;
use std::collections::HashSet;

/// Check required parameters and return the config with a normalized prefix.
pub fn validate(mut config: GlobalConfig) -> Result<GlobalConfig, ConfigError> {
    let conn = &config.connection;
    for (name, value) in [
        ("host", &conn.host),
        ("user", &conn.user),
        ("password", &conn.password),
        ("database", &conn.database),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingParameter(name));
        }
    }
    if conn.schema.trim().is_empty() {
        return Err(ConfigError::Validation("schema must not be empty".into()));
    }

    let mut seen = HashSet::new();
    for model in &config.models {
        if !seen.insert(model.table_name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "more than one model override for table '{}'",
                model.table_name
            )));
        }
    }

    config.prefix = normalize_prefix(&config.prefix);
    Ok(config)
}

/// "" stays empty; otherwise a single leading slash and no trailing slash ("api/v1/" -> "/api/v1").
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
