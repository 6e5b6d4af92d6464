//! Caller-supplied configuration: connection parameters, hidden tables, model overrides.

use crate::error::ConfigError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// CRUD verb. Maps to POST, GET, PATCH and DELETE respectively.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Verb {
    Create,
    Read,
    Update,
    Delete,
}

impl Verb {
    pub const ALL: [Verb; 4] = [Verb::Create, Verb::Read, Verb::Update, Verb::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Create => "create",
            Verb::Read => "read",
            Verb::Update => "update",
            Verb::Delete => "delete",
        }
    }

    pub fn http_method(&self) -> axum::http::Method {
        match self {
            Verb::Create => axum::http::Method::POST,
            Verb::Read => axum::http::Method::GET,
            Verb::Update => axum::http::Method::PATCH,
            Verb::Delete => axum::http::Method::DELETE,
        }
    }
}

/// Accepts the CRUD name or the HTTP method name ("read" and "get" are the same verb).
impl FromStr for Verb {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "create" | "post" => Ok(Verb::Create),
            "read" | "get" => Ok(Verb::Read),
            "update" | "patch" => Ok(Verb::Update),
            "delete" => Ok(Verb::Delete),
            _ => Err(ConfigError::UnknownVerb(s.to_string())),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Verb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Verb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Per-table access policy: every verb, or an explicit subset.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Access {
    #[default]
    All,
    Only(BTreeSet<Verb>),
}

impl Access {
    pub fn only<I: IntoIterator<Item = Verb>>(verbs: I) -> Self {
        Access::Only(verbs.into_iter().collect())
    }

    pub fn allows(&self, verb: Verb) -> bool {
        match self {
            Access::All => true,
            Access::Only(set) => set.contains(&verb),
        }
    }
}

impl Serialize for Access {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Access::All => serializer.serialize_str("all"),
            Access::Only(set) => set.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Access {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer)?;
        match v {
            serde_json::Value::String(s) if s.eq_ignore_ascii_case("all") => Ok(Access::All),
            serde_json::Value::String(s) => Err(serde::de::Error::custom(ConfigError::InvalidAccess(s))),
            serde_json::Value::Array(items) => {
                let mut set = BTreeSet::new();
                for item in items {
                    match item {
                        serde_json::Value::String(s) => {
                            set.insert(s.parse::<Verb>().map_err(serde::de::Error::custom)?);
                        }
                        other => {
                            return Err(serde::de::Error::custom(ConfigError::InvalidAccess(other.to_string())));
                        }
                    }
                }
                Ok(Access::Only(set))
            }
            other => Err(serde::de::Error::custom(ConfigError::InvalidAccess(other.to_string()))),
        }
    }
}

/// User-declared customization for one table, matched by exact name.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelOverride {
    pub table_name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub access: Option<Access>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub database: String,
    /// Schema whose relations are exposed.
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Upper bound a request waits for a free pooled connection.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    /// Session run-time parameters passed to the server (e.g. `statement_timeout`).
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

fn default_port() -> u16 {
    5432
}

fn default_schema() -> String {
    "public".into()
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    30
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            host: String::new(),
            port: default_port(),
            user: String::new(),
            password: String::new(),
            database: String::new(),
            schema: default_schema(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            options: BTreeMap::new(),
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("options", &self.options)
            .finish()
    }
}

impl ConnectionConfig {
    pub fn connect_options(&self) -> PgConnectOptions {
        let opts = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database);
        if self.options.is_empty() {
            opts
        } else {
            opts.options(self.options.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        }
    }

    pub fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
    }
}

/// Process-wide configuration, fixed at construction. `verbose` only seeds the runtime flag.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub hidden_tables: Vec<String>,
    #[serde(default)]
    pub models: Vec<ModelOverride>,
    #[serde(default)]
    pub prefix: String,
    /// Cache lifetime in hours; 0 disables caching.
    #[serde(default = "default_lifetime")]
    pub lifetime: u32,
    #[serde(default)]
    pub verbose: bool,
}

fn default_lifetime() -> u32 {
    24
}

impl GlobalConfig {
    pub fn new(connection: ConnectionConfig) -> Self {
        GlobalConfig {
            connection,
            hidden_tables: Vec::new(),
            models: Vec::new(),
            prefix: String::new(),
            lifetime: default_lifetime(),
            verbose: false,
        }
    }

    /// Cache-Control header value derived from `lifetime`.
    pub fn cache_control(&self) -> String {
        if self.lifetime == 0 {
            "no-cache, no-store, must-revalidate".into()
        } else {
            format!("public, max-age={}", u64::from(self.lifetime) * 60 * 60)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn verb_accepts_crud_and_http_names() {
        assert_eq!("get".parse::<Verb>().unwrap(), Verb::Read);
        assert_eq!("READ".parse::<Verb>().unwrap(), Verb::Read);
        assert_eq!("post".parse::<Verb>().unwrap(), Verb::Create);
        assert_eq!("patch".parse::<Verb>().unwrap(), Verb::Update);
        assert_eq!("delete".parse::<Verb>().unwrap(), Verb::Delete);
        assert!("put".parse::<Verb>().is_err());
    }

    #[test]
    fn access_parses_sentinel_and_lists() {
        let all: Access = serde_json::from_value(json!("all")).unwrap();
        assert_eq!(all, Access::All);
        let some: Access = serde_json::from_value(json!(["get", "patch"])).unwrap();
        assert_eq!(some, Access::only([Verb::Read, Verb::Update]));
        let none: Access = serde_json::from_value(json!([])).unwrap();
        assert_eq!(none, Access::Only(BTreeSet::new()));
    }

    #[test]
    fn access_rejects_other_keywords() {
        assert!(serde_json::from_value::<Access>(json!("everything")).is_err());
        assert!(serde_json::from_value::<Access>(json!(["get", 3])).is_err());
        assert!(serde_json::from_value::<Access>(json!(true)).is_err());
    }

    #[test]
    fn access_serializes_back_to_config_shape() {
        assert_eq!(serde_json::to_value(Access::All).unwrap(), json!("all"));
        assert_eq!(
            serde_json::to_value(Access::only([Verb::Delete, Verb::Read])).unwrap(),
            json!(["read", "delete"])
        );
    }

    #[test]
    fn global_config_defaults() {
        let config: GlobalConfig = serde_json::from_value(json!({
            "connection": { "host": "db", "user": "u", "password": "p", "database": "d" }
        }))
        .unwrap();
        assert_eq!(config.lifetime, 24);
        assert_eq!(config.connection.port, 5432);
        assert_eq!(config.connection.schema, "public");
        assert!(config.prefix.is_empty());
        assert!(!config.verbose);
    }

    #[test]
    fn cache_control_follows_lifetime() {
        let mut config = GlobalConfig::new(ConnectionConfig::default());
        assert_eq!(config.cache_control(), "public, max-age=86400");
        config.lifetime = 0;
        assert_eq!(config.cache_control(), "no-cache, no-store, must-revalidate");
    }

    #[test]
    fn debug_redacts_password() {
        let conn = ConnectionConfig {
            password: "hunter2".into(),
            ..ConnectionConfig::default()
        };
        assert!(!format!("{:?}", conn).contains("hunter2"));
    }
}
