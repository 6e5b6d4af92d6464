//! Operational routes: registered tables, bound routes, verbose toggle. Present whatever the table policies.

use crate::handlers::{list_routes, list_tables, set_verbose};
use crate::routes::RouteTable;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn operational_routes(routes: &RouteTable) -> Router<AppState> {
    Router::new()
        .route(&routes.tables_path(), get(list_tables))
        .route(&routes.routes_path(), get(list_routes))
        .route(&routes.verbose_path(), get(set_verbose))
}
