//! Binds the synthesized route table onto an axum router, one method router per path template.

use crate::config::Verb;
use crate::error::AppError;
use crate::extractors::RowBody;
use crate::handlers::{dispatch, failure, not_found};
use crate::sql::Operation;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    routing::{MethodFilter, MethodRouter},
    Router,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

fn method_filter(verb: Verb) -> MethodFilter {
    match verb {
        Verb::Create => MethodFilter::POST,
        Verb::Read => MethodFilter::GET,
        Verb::Update => MethodFilter::PATCH,
        Verb::Delete => MethodFilter::DELETE,
    }
}

type PathParams = Option<Path<HashMap<String, String>>>;

fn path_map(params: PathParams) -> HashMap<String, String> {
    params.map(|Path(p)| p).unwrap_or_default()
}

/// Table routes from `state.routes`. Unbound methods on a bound path answer 404, like unbound paths.
pub fn entity_routes(state: &AppState) -> Router<AppState> {
    let mut by_path: BTreeMap<String, MethodRouter<AppState>> = BTreeMap::new();

    for entry in state.routes.entries() {
        let route = Arc::new(entry.clone());
        let filter = method_filter(route.verb);
        let template = route.path.clone();
        let method_router = by_path
            .remove(&template)
            .unwrap_or_else(|| MethodRouter::new().fallback(not_found));

        let method_router = match route.operation {
            Operation::Create | Operation::Update => method_router.on(
                filter,
                move |State(state): State<AppState>, params: PathParams, body: Result<RowBody, AppError>| async move {
                    match body {
                        Ok(RowBody(body)) => dispatch(state, &route, path_map(params), body).await,
                        Err(err) => failure(&state, &route, err),
                    }
                },
            ),
            _ => method_router.on(filter, move |State(state): State<AppState>, params: PathParams| async move {
                dispatch(state, &route, path_map(params), None).await
            }),
        };
        by_path.insert(template, method_router);
    }

    by_path
        .into_iter()
        .fold(Router::new(), |router, (path, method_router)| router.route(&path, method_router))
}
