//! Statement execution against a pooled PostgreSQL connection.

use crate::error::AppError;
use crate::sql::{RowShape, SqlStatement};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::PgPool;

/// Runs one built statement and returns its rows as JSON.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, statement: SqlStatement) -> Result<Vec<Value>, AppError>;
}

/// Executor backed by a bounded `sqlx` pool. Each call holds one connection for one statement, outside any transaction.
#[derive(Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        PgExecutor { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Executor for PgExecutor {
    async fn execute(&self, statement: SqlStatement) -> Result<Vec<Value>, AppError> {
        let pool = self.pool.clone();
        // Detached: a dropped request still lets the statement finish and return its connection.
        tokio::spawn(async move { run(&pool, &statement).await })
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "statement task failed");
                AppError::Database(sqlx::Error::WorkerCrashed)
            })?
    }
}

async fn run(pool: &PgPool, statement: &SqlStatement) -> Result<Vec<Value>, AppError> {
    tracing::debug!(sql = %statement.sql, params = ?statement.params, "query");
    // Waits for a free connection up to the pool's acquire timeout. Released on drop, on every path.
    let mut conn = pool.acquire().await?;
    let mut query = sqlx::query(&statement.sql);
    for p in &statement.params {
        query = query.bind(p.clone());
    }
    let rows = query.fetch_all(&mut *conn).await?;
    Ok(match statement.shape {
        RowShape::Document => rows.iter().map(document_to_json).collect(),
        RowShape::Columns => rows.iter().map(row_to_json).collect(),
    })
}

fn document_to_json(row: &PgRow) -> Value {
    use sqlx::Row;
    row.try_get::<Option<Value>, _>(0).ok().flatten().unwrap_or(Value::Null)
}

fn row_to_json(row: &PgRow) -> Value {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
