//! Generic CRUD over any registered table.

use crate::config::{TableDescriptor, TableKind};
use crate::error::AppError;
use crate::service::Executor;
use crate::sql::{build, status_probe, status_timestamp, CrudParams, Operation};
use serde_json::{json, Value};

pub struct CrudService;

impl CrudService {
    /// Build and run `op`. Build failures return before anything reaches the executor.
    pub async fn run(
        executor: &dyn Executor,
        table: &TableDescriptor,
        op: Operation,
        params: &CrudParams,
    ) -> Result<Value, AppError> {
        let statement = build(table, op, params)?;
        match op {
            Operation::Status => {
                let rows = executor.execute(statement).await?;
                Self::status(executor, table, rows).await
            }
            Operation::Describe => {
                let rows = executor.execute(statement).await?;
                Ok(Value::Array(mark_primary_key(table, rows)))
            }
            _ => Ok(Value::Array(executor.execute(statement).await?)),
        }
    }

    /// Freshness: the newest commit time when the server tracks commit timestamps, else prove the
    /// relation answers and report now.
    async fn status(executor: &dyn Executor, table: &TableDescriptor, rows: Vec<Value>) -> Result<Value, AppError> {
        let tracking = first_field(rows, "tracking")
            .as_ref()
            .and_then(Value::as_str)
            .map(|s| s.eq_ignore_ascii_case("on"))
            .unwrap_or(false);
        if tracking && table.kind == TableKind::Table {
            let rows = executor.execute(status_timestamp(table)).await?;
            if let Some(updated_at) = first_field(rows, "updated_at") {
                return Ok(json!({
                    "table": table.public_name(),
                    "updated_at": updated_at,
                    "source": "commit_timestamp",
                }));
            }
        }
        executor.execute(status_probe(table)).await?;
        Ok(json!({
            "table": table.public_name(),
            "updated_at": chrono::Utc::now().to_rfc3339(),
            "source": "probe",
        }))
    }
}

/// Non-null `field` of the first row.
fn first_field(rows: Vec<Value>, field: &str) -> Option<Value> {
    rows.into_iter()
        .next()
        .and_then(|row| match row {
            Value::Object(mut map) => map.remove(field),
            _ => None,
        })
        .filter(|v| !v.is_null())
}

fn mark_primary_key(table: &TableDescriptor, rows: Vec<Value>) -> Vec<Value> {
    rows.into_iter()
        .map(|mut row| {
            if let Value::Object(map) = &mut row {
                let is_key = map
                    .get("field")
                    .and_then(Value::as_str)
                    .map(|f| table.is_primary_key(f))
                    .unwrap_or(false);
                map.insert("key".into(), Value::String(if is_key { "PRI" } else { "" }.into()));
            }
            row
        })
        .collect()
}
