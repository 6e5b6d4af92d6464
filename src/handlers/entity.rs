//! Table CRUD handlers: one dispatch path for every synthesized route.

use crate::error::AppError;
use crate::response::success;
use crate::routes::RouteEntry;
use crate::service::CrudService;
use crate::sql::CrudParams;
use crate::state::AppState;
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Run the route's operation with parameters taken from the matched path and body.
pub async fn dispatch(
    state: AppState,
    route: &RouteEntry,
    mut path: HashMap<String, String>,
    body: Option<Map<String, Value>>,
) -> Response {
    let params = CrudParams {
        key: path.remove("key"),
        id: path.remove("id"),
        column: path.remove("column"),
        order: path.remove("order"),
        limit: path.remove("limit"),
        body,
    };
    match CrudService::run(state.executor.as_ref(), &route.table, route.operation, &params).await {
        Ok(out) => success(route.verb, out),
        Err(e) => failure(&state, route, e),
    }
}

/// Log a failed request: in full at `error` when verbose, only the status at `debug` otherwise.
pub fn report(state: &AppState, request: &str, err: &AppError) {
    if state.verbose.get() {
        tracing::error!(request = %request, status = %err.status(), error = %err, "request failed");
    } else {
        tracing::debug!(request = %request, status = %err.status(), "request failed");
    }
}

/// Log the failure and answer with the generic message for its kind.
pub fn failure(state: &AppState, route: &RouteEntry, err: AppError) -> Response {
    let request = format!(
        "{} {} ({} {:?})",
        route.verb.http_method(),
        route.path,
        route.table.name,
        route.operation
    );
    report(state, &request, &err);
    err.into_response()
}
