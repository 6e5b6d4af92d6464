//! lazyrest: REST CRUD endpoints synthesized from a PostgreSQL schema at boot.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;

pub use catalog::{load_catalog, RawRelation};
pub use config::{Access, ConnectionConfig, GlobalConfig, ModelOverride, Registry, TableDescriptor, TableKind, Verb};
pub use engine::Engine;
pub use error::{AppError, ConfigError, QueryBuildError};
pub use routes::{api_router, synthesize, BoundRoute, RouteEntry, RouteTable};
pub use service::{CrudService, Executor, PgExecutor};
pub use sql::{build, CrudParams, Operation, SqlStatement};
pub use state::{AppState, VerboseFlag};
