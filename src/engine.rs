//! Boot sequence: validate config, open the pool, read the catalog, build registry and routes once.

use crate::catalog::{load_catalog, RawRelation};
use crate::config::{build_registry, normalize_prefix, validate, GlobalConfig, Registry};
use crate::error::AppError;
use crate::routes::{api_router, synthesize, RouteTable};
use crate::service::{Executor, PgExecutor};
use crate::state::{AppState, VerboseFlag};
use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue},
    Router, ServiceExt,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::Layer;
use tower_http::{
    limit::RequestBodyLimitLayer, normalize_path::NormalizePath, normalize_path::NormalizePathLayer,
    set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

/// Request bodies above this are rejected before reaching a handler.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub struct Engine {
    state: AppState,
    config: GlobalConfig,
}

impl Engine {
    /// Validate `config`, connect lazily, and introspect the schema. Fails on config or catalog errors.
    pub async fn connect(config: GlobalConfig) -> Result<Engine, AppError> {
        let config = validate(config)?;
        let pool = config
            .connection
            .pool_options()
            .connect_lazy_with(config.connection.connect_options());
        let relations = load_catalog(&pool, &config.connection.schema, &config.hidden_tables).await?;
        Ok(Self::assemble(config, relations, Arc::new(PgExecutor::new(pool))))
    }

    /// Build registry and routes from an already-read catalog. Relations are taken as given.
    pub fn assemble(mut config: GlobalConfig, relations: Vec<RawRelation>, executor: Arc<dyn Executor>) -> Engine {
        config.prefix = normalize_prefix(&config.prefix);
        let registry = build_registry(&relations, &config.models);
        let routes = synthesize(&registry, &config.prefix);
        tracing::info!(
            schema = %config.connection.schema,
            tables = registry.len(),
            routes = routes.entries().len(),
            prefix = %config.prefix,
            "lazyrest engine ready"
        );
        let state = AppState {
            executor,
            registry: Arc::new(registry),
            routes: Arc::new(routes),
            verbose: VerboseFlag::new(config.verbose),
        };
        Engine { state, config }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn registry(&self) -> &Registry {
        &self.state.registry
    }

    pub fn routes(&self) -> &RouteTable {
        &self.state.routes
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// The API router with response headers, body limit and tracing applied.
    pub fn router(&self) -> Router {
        let cache_control = HeaderValue::from_str(&self.config.cache_control())
            .unwrap_or_else(|_| HeaderValue::from_static("no-cache, no-store, must-revalidate"));
        api_router(self.state.clone())
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
            .layer(SetResponseHeaderLayer::overriding(header::CACHE_CONTROL, cache_control))
            .layer(SetResponseHeaderLayer::overriding(
                HeaderName::from_static("x-powered-by"),
                HeaderValue::from_static("lazyrest"),
            ))
            .layer(TraceLayer::new_for_http())
    }

    /// `router()` behind trailing-slash normalization, which has to run before routing.
    pub fn service(&self) -> NormalizePath<Router> {
        NormalizePathLayer::trim_trailing_slash().layer(self.router())
    }

    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        let service = self.service();
        axum::serve(listener, ServiceExt::<Request>::into_make_service(service)).await
    }
}
