//! Route synthesis and router assembly.

mod common;
mod entity;
mod table;

pub use common::operational_routes;
pub use entity::entity_routes;
pub use table::*;

use crate::handlers::not_found;
use crate::state::AppState;
use axum::Router;

/// Every synthesized table route plus the operational routes, with a 404 fallback for the rest.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .merge(operational_routes(&state.routes))
        .merge(entity_routes(&state))
        .fallback(not_found)
        .with_state(state)
}
