//! Operational endpoints: registered tables, bound routes, verbose toggle.

use crate::config::{is_truthy, TableDescriptor};
use crate::error::AppError;
use crate::handlers::report;
use crate::routes::BoundRoute;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{Method, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

pub async fn list_tables(State(state): State<AppState>) -> Json<Vec<TableDescriptor>> {
    Json(state.registry.tables().iter().map(|t| t.as_ref().clone()).collect())
}

pub async fn list_routes(State(state): State<AppState>) -> Json<Vec<BoundRoute>> {
    Json(state.routes.bound())
}

pub async fn set_verbose(State(state): State<AppState>, Path(status): Path<String>) -> Json<Value> {
    let on = is_truthy(&status);
    state.verbose.set(on);
    tracing::info!(verbose = on, "verbose error logging toggled");
    Json(json!({ "verbose": on }))
}

pub async fn not_found(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    let err = AppError::RouteNotFound(uri.path().to_string());
    report(&state, &format!("{} {}", method, uri.path()), &err);
    err.into_response()
}
