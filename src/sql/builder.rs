//! Builds parameterized INSERT, SELECT, UPDATE, DELETE, describe and status statements for a table.

use crate::config::{TableDescriptor, Verb};
use crate::error::QueryBuildError;
use crate::sql::BindValue;
use serde_json::{Map, Value};

/// Alias of the target relation in every generated statement.
const TGT: &str = "\"tgt\"";
/// Alias of the typed row built from a request body.
const SRC: &str = "\"src\"";

/// What one synthesized route does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    ReadAll,
    Describe,
    ReadByKey,
    Search,
    Status,
    Update,
    Delete,
}

impl Operation {
    pub fn verb(&self) -> Verb {
        match self {
            Operation::Create => Verb::Create,
            Operation::Update => Verb::Update,
            Operation::Delete => Verb::Delete,
            Operation::ReadAll
            | Operation::Describe
            | Operation::ReadByKey
            | Operation::Search
            | Operation::Status => Verb::Read,
        }
    }
}

/// How result rows are turned into JSON.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowShape {
    /// Single JSONB column holding the whole row.
    Document,
    /// Plain columns, decoded one by one.
    Columns,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<BindValue>,
    pub shape: RowShape,
}

impl SqlStatement {
    fn new(shape: RowShape) -> Self {
        SqlStatement {
            sql: String::new(),
            params: Vec::new(),
            shape,
        }
    }

    fn push_param(&mut self, v: BindValue) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// Parameters of one operation request, taken from the path and body.
#[derive(Clone, Debug, Default)]
pub struct CrudParams {
    pub key: Option<String>,
    pub id: Option<String>,
    pub column: Option<String>,
    pub order: Option<String>,
    pub limit: Option<String>,
    pub body: Option<Map<String, Value>>,
}

/// Quote identifier for PostgreSQL.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
fn qualified_table(table: &TableDescriptor) -> String {
    format!("{}.{}", quoted(&table.schema), quoted(&table.name))
}

/// Build the statement for `op`. Fails without touching the database when parameters are missing or invalid.
pub fn build(table: &TableDescriptor, op: Operation, params: &CrudParams) -> Result<SqlStatement, QueryBuildError> {
    match op {
        Operation::Create => insert(table, params),
        Operation::ReadAll => select(table, None, params),
        Operation::ReadByKey => {
            let filter = key_filter(table, params, true)?;
            select(table, Some(filter), params)
        }
        Operation::Search => {
            let filter = key_filter(table, params, false)?;
            select(table, Some(filter), params)
        }
        Operation::Update => update(table, params),
        Operation::Delete => delete(table, params),
        Operation::Describe => Ok(describe(table)),
        Operation::Status => Ok(commit_tracking()),
    }
}

/// `key`/`id` pair for an equality filter. With `primary_only`, key must be a primary-key column.
fn key_filter<'a>(
    table: &TableDescriptor,
    params: &'a CrudParams,
    primary_only: bool,
) -> Result<(&'a str, &'a str), QueryBuildError> {
    let key = params
        .key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or(QueryBuildError::MissingParameter("key"))?;
    if primary_only && !table.is_primary_key(key) {
        return Err(QueryBuildError::InvalidPrimaryKey {
            table: table.name.clone(),
            key: key.to_string(),
        });
    }
    let id = params.id.as_deref().ok_or(QueryBuildError::MissingParameter("id"))?;
    Ok((key, id))
}

/// Equality on `key` against `id` read through the table's row type, so the column is compared
/// as itself (and its index stays usable) rather than as text.
fn key_predicate(q: &mut SqlStatement, table: &TableDescriptor, key: &str, id: &str) -> String {
    let key_param = q.push_param(BindValue::from(key));
    let id_param = q.push_param(BindValue::from(id));
    format!(
        "{tgt}.{col} = (jsonb_populate_record(NULL::{target}, jsonb_build_object(${k}::text, ${v}::text))).{col}",
        tgt = TGT,
        col = quoted(key),
        target = qualified_table(table),
        k = key_param,
        v = id_param
    )
}

fn body_of(params: &CrudParams) -> Result<&Map<String, Value>, QueryBuildError> {
    params
        .body
        .as_ref()
        .filter(|b| !b.is_empty())
        .ok_or(QueryBuildError::EmptyBody)
}

fn order_direction(order: &str) -> Result<&'static str, QueryBuildError> {
    if order.eq_ignore_ascii_case("asc") {
        Ok("ASC")
    } else if order.eq_ignore_ascii_case("desc") {
        Ok("DESC")
    } else {
        Err(QueryBuildError::InvalidOrder(order.to_string()))
    }
}

fn parse_limit(limit: &str) -> Result<i64, QueryBuildError> {
    limit
        .trim()
        .parse::<u32>()
        .map(i64::from)
        .map_err(|_| QueryBuildError::InvalidLimit(limit.to_string()))
}

/// SELECT whole rows, optionally filtered on one column, ordered and limited.
fn select(
    table: &TableDescriptor,
    filter: Option<(&str, &str)>,
    params: &CrudParams,
) -> Result<SqlStatement, QueryBuildError> {
    let mut q = SqlStatement::new(RowShape::Document);
    let mut sql = format!(
        "SELECT to_jsonb({tgt}) AS \"row\" FROM {} AS {tgt}",
        qualified_table(table),
        tgt = TGT
    );
    if let Some((key, id)) = filter {
        sql.push_str(&format!(" WHERE {}", key_predicate(&mut q, table, key, id)));
    }
    if let (Some(column), Some(order)) = (params.column.as_deref(), params.order.as_deref()) {
        let direction = order_direction(order)?;
        sql.push_str(&format!(" ORDER BY {}.{} {}", TGT, quoted(column), direction));
    }
    if let Some(limit) = params.limit.as_deref() {
        let n = q.push_param(BindValue::Int(parse_limit(limit)?));
        sql.push_str(&format!(" LIMIT ${}", n));
    }
    q.sql = sql;
    Ok(q)
}

/// INSERT: column list from the body; values come from one JSONB parameter typed by the table's row type.
fn insert(table: &TableDescriptor, params: &CrudParams) -> Result<SqlStatement, QueryBuildError> {
    let body = body_of(params)?;
    let mut q = SqlStatement::new(RowShape::Document);
    let target = qualified_table(table);
    let cols = body.keys().map(|c| quoted(c)).collect::<Vec<_>>().join(", ");
    let n = q.push_param(BindValue::Json(Value::Object(body.clone())));
    q.sql = format!(
        "INSERT INTO {target} AS {tgt} ({cols}) SELECT {cols} FROM jsonb_populate_record(NULL::{target}, ${n}) RETURNING to_jsonb({tgt})",
        target = target,
        tgt = TGT,
        cols = cols,
        n = n
    );
    Ok(q)
}

/// UPDATE by key: SET only the columns present in the body.
fn update(table: &TableDescriptor, params: &CrudParams) -> Result<SqlStatement, QueryBuildError> {
    let (key, id) = key_filter(table, params, true)?;
    let body = body_of(params)?;
    let mut q = SqlStatement::new(RowShape::Document);
    let target = qualified_table(table);
    let sets = body
        .keys()
        .map(|c| format!("{} = {}.{}", quoted(c), SRC, quoted(c)))
        .collect::<Vec<_>>()
        .join(", ");
    let row_param = q.push_param(BindValue::Json(Value::Object(body.clone())));
    let filter = key_predicate(&mut q, table, key, id);
    q.sql = format!(
        "UPDATE {target} AS {tgt} SET {sets} FROM jsonb_populate_record(NULL::{target}, ${row_param}) AS {src} WHERE {filter} RETURNING to_jsonb({tgt})",
        target = target,
        tgt = TGT,
        src = SRC,
        sets = sets,
        row_param = row_param,
        filter = filter
    );
    Ok(q)
}

/// DELETE by key.
fn delete(table: &TableDescriptor, params: &CrudParams) -> Result<SqlStatement, QueryBuildError> {
    let (key, id) = key_filter(table, params, true)?;
    let mut q = SqlStatement::new(RowShape::Document);
    let filter = key_predicate(&mut q, table, key, id);
    q.sql = format!(
        "DELETE FROM {} AS {tgt} WHERE {} RETURNING to_jsonb({tgt})",
        qualified_table(table),
        filter,
        tgt = TGT
    );
    Ok(q)
}

/// Column metadata in ordinal order.
pub fn describe(table: &TableDescriptor) -> SqlStatement {
    let mut q = SqlStatement::new(RowShape::Columns);
    let schema = q.push_param(BindValue::from(table.schema.as_str()));
    let name = q.push_param(BindValue::from(table.name.as_str()));
    q.sql = format!(
        "SELECT c.column_name::text AS \"field\", c.data_type::text AS \"type\", c.is_nullable::text AS \"null\", \
         c.column_default::text AS \"default\" \
         FROM information_schema.columns c \
         WHERE c.table_schema = ${} AND c.table_name = ${} \
         ORDER BY c.ordinal_position",
        schema, name
    );
    q
}

/// Whether the server records commit timestamps. NULL when the setting is unknown.
pub fn commit_tracking() -> SqlStatement {
    let mut q = SqlStatement::new(RowShape::Columns);
    q.sql = "SELECT current_setting('track_commit_timestamp', true) AS \"tracking\"".into();
    q
}

/// Commit time of the newest row version. Only valid when commit timestamps are tracked, and only on tables.
pub fn status_timestamp(table: &TableDescriptor) -> SqlStatement {
    let mut q = SqlStatement::new(RowShape::Columns);
    q.sql = format!(
        "SELECT max(pg_xact_commit_timestamp({tgt}.xmin)) AS \"updated_at\" FROM {} AS {tgt}",
        qualified_table(table),
        tgt = TGT
    );
    q
}

/// Cheap existence probe used when no timestamp is available.
pub fn status_probe(table: &TableDescriptor) -> SqlStatement {
    let mut q = SqlStatement::new(RowShape::Columns);
    q.sql = format!("SELECT 1 AS \"probe\" FROM {} LIMIT 1", qualified_table(table));
    q
}
