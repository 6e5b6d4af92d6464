//! Catalog discovery: relations of one schema with their aggregated primary-key columns.

use crate::error::AppError;
use sqlx::PgPool;

/// One relation as reported by `information_schema`, before policy is applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawRelation {
    pub name: String,
    /// `table_type` from the catalog ("BASE TABLE", "VIEW", ...).
    pub kind: String,
    pub schema: String,
    /// Primary-key columns in key order; empty when the relation has no key.
    pub primary_key: Vec<String>,
}

/// One row per relation; hidden names are filtered inside the query so they never leave the catalog.
const CATALOG_SQL: &str = r#"
SELECT
    t.table_name::text AS table_name,
    t.table_type::text AS table_type,
    t.table_schema::text AS table_schema,
    COALESCE(
        array_agg(kcu.column_name::text ORDER BY kcu.ordinal_position)
            FILTER (WHERE kcu.column_name IS NOT NULL),
        ARRAY[]::text[]
    ) AS primary_keys
FROM information_schema.tables t
LEFT JOIN information_schema.table_constraints tc
    ON tc.table_schema = t.table_schema
   AND tc.table_name = t.table_name
   AND tc.constraint_type = 'PRIMARY KEY'
LEFT JOIN information_schema.key_column_usage kcu
    ON kcu.constraint_schema = tc.constraint_schema
   AND kcu.constraint_name = tc.constraint_name
   AND kcu.table_name = tc.table_name
WHERE t.table_schema = $1
  AND NOT (t.table_name::text = ANY($2))
GROUP BY t.table_schema, t.table_name, t.table_type
ORDER BY t.table_name
"#;

/// Load every relation of `schema` except those named in `hidden`.
pub async fn load_catalog(pool: &PgPool, schema: &str, hidden: &[String]) -> Result<Vec<RawRelation>, AppError> {
    tracing::debug!(schema = %schema, hidden = ?hidden, "loading catalog");
    let rows = sqlx::query_as::<_, (String, String, String, Vec<String>)>(CATALOG_SQL)
        .bind(schema)
        .bind(hidden)
        .fetch_all(pool)
        .await
        .map_err(AppError::Schema)?;

    Ok(rows
        .into_iter()
        .map(|(name, kind, schema, primary_key)| RawRelation {
            name,
            kind,
            schema,
            primary_key,
        })
        .collect())
}
