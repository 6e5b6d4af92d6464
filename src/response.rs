//! Success responses: rows as JSON, status by verb.

use crate::config::Verb;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

/// 201 for CREATE and UPDATE, 200 otherwise.
pub fn success_status(verb: Verb) -> StatusCode {
    match verb {
        Verb::Create | Verb::Update => StatusCode::CREATED,
        Verb::Read | Verb::Delete => StatusCode::OK,
    }
}

pub fn success(verb: Verb, body: Value) -> Response {
    (success_status(verb), Json(body)).into_response()
}
