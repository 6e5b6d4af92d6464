//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing connection parameter: {0}")]
    MissingParameter(&'static str),
    #[error("invalid access policy '{0}' (expected \"all\" or a list of verbs)")]
    InvalidAccess(String),
    #[error("unknown verb: {0}")]
    UnknownVerb(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Raised before any statement is sent: the operation parameters cannot form a valid query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryBuildError {
    #[error("invalid primary key: table {table} has no key column '{key}'")]
    InvalidPrimaryKey { table: String, key: String },
    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),
    #[error("body must be a non-empty object of column values")]
    EmptyBody,
    #[error("unreadable body: {0}")]
    InvalidBody(String),
    #[error("invalid sort order '{0}' (expected asc or desc)")]
    InvalidOrder(String),
    #[error("invalid limit '{0}'")]
    InvalidLimit(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("schema introspection: {0}")]
    Schema(#[source] sqlx::Error),
    #[error(transparent)]
    QueryBuild(#[from] QueryBuildError),
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("route not found: {0}")]
    RouteNotFound(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) | AppError::Schema(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::QueryBuild(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) => StatusCode::BAD_GATEWAY,
            AppError::RouteNotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Message safe to hand to clients; never includes schema or query details.
    pub fn public_message(&self) -> &'static str {
        match self {
            AppError::Config(_) | AppError::Schema(_) => "500: the service is misconfigured.",
            AppError::QueryBuild(_) => "400: invalid request parameters.",
            AppError::Database(_) => "502: the database could not complete the request.",
            AppError::RouteNotFound(_) => "404: route not found.",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), self.public_message()).into_response()
    }
}
