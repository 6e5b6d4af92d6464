//! Extract the column map of a create/update request from a JSON or url-encoded body.

use crate::error::{AppError, QueryBuildError};
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    Form,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Column values from the request body. `None` when the body is empty.
#[derive(Clone, Debug)]
pub struct RowBody(pub Option<Map<String, Value>>);

fn is_form(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.trim_start().starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

#[async_trait]
impl<S> FromRequest<S> for RowBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_form(&req) {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| QueryBuildError::InvalidBody(e.body_text()))?;
            let map: Map<String, Value> = fields.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
            return Ok(RowBody(Some(map).filter(|m| !m.is_empty())));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| QueryBuildError::InvalidBody(e.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(RowBody(None));
        }
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Ok(RowBody(Some(map))),
            Ok(_) => Err(QueryBuildError::InvalidBody("expected a JSON object".into()).into()),
            Err(e) => Err(QueryBuildError::InvalidBody(e.to_string()).into()),
        }
    }
}
