//! Integration tests against a live PostgreSQL. Skipped unless `DATABASE_URL` is set.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use lazyrest::{build, load_catalog, ConnectionConfig, CrudParams, Engine, GlobalConfig, Operation, PgExecutor};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tower::ServiceExt;

/// A throwaway schema with a keyed table, a view over it and a table meant to be hidden.
struct Fixture {
    pool: PgPool,
    schema: String,
}

impl Fixture {
    async fn create(max_connections: u32) -> Option<Fixture> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(&url)
            .await
            .expect("connect to DATABASE_URL");
        let schema = format!("lazyrest_{}", uuid::Uuid::new_v4().simple());
        let ddl = format!(
            r#"
            CREATE SCHEMA "{s}";
            CREATE TABLE "{s}"."city" (id serial PRIMARY KEY, name text NOT NULL, population integer);
            CREATE VIEW "{s}"."v_city" AS SELECT id, name FROM "{s}"."city";
            CREATE TABLE "{s}"."secret" (id integer PRIMARY KEY, token text);
            "#,
            s = schema
        );
        sqlx::raw_sql(&ddl).execute(&pool).await.expect("create fixture schema");
        Some(Fixture { pool, schema })
    }

    async fn engine(&self, hidden: &[&str]) -> Engine {
        let hidden: Vec<String> = hidden.iter().map(|h| h.to_string()).collect();
        let relations = load_catalog(&self.pool, &self.schema, &hidden).await.expect("catalog");
        let mut config = GlobalConfig::new(ConnectionConfig {
            schema: self.schema.clone(),
            ..ConnectionConfig::default()
        });
        config.hidden_tables = hidden;
        Engine::assemble(config, relations, Arc::new(PgExecutor::new(self.pool.clone())))
    }

    async fn teardown(self) {
        let ddl = format!(r#"DROP SCHEMA "{}" CASCADE"#, self.schema);
        sqlx::raw_sql(&ddl).execute(&self.pool).await.expect("drop fixture schema");
    }
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(payload) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            builder.body(Body::from(serde_json::to_vec(&payload).unwrap())).unwrap()
        }
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn catalog_lists_relations_with_keys_and_hides_names() {
    let Some(fixture) = Fixture::create(2).await else { return };

    let relations = load_catalog(&fixture.pool, &fixture.schema, &["secret".to_string()])
        .await
        .unwrap();
    let names: Vec<&str> = relations.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["city", "v_city"]);
    assert_eq!(relations[0].kind, "BASE TABLE");
    assert_eq!(relations[0].primary_key, vec!["id".to_string()]);
    assert_eq!(relations[1].kind, "VIEW");
    assert!(relations[1].primary_key.is_empty());

    let engine = fixture.engine(&["secret"]).await;
    let (status, _) = send(&engine.router(), Method::GET, "/secret", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    fixture.teardown().await;
}

#[tokio::test]
async fn create_then_read_by_key() {
    let Some(fixture) = Fixture::create(2).await else { return };
    let router = fixture.engine(&[]).await.router();

    let (status, created) = send(
        &router,
        Method::POST,
        "/city",
        Some(json!({"name": "Oslo", "population": 700000})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created[0]["id"].as_i64().expect("generated id");
    assert_eq!(created[0]["name"], "Oslo");

    let (status, rows) = send(&router, Method::GET, &format!("/city/id/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows, json!([{"id": id, "name": "Oslo", "population": 700000}]));

    let (status, updated) = send(
        &router,
        Method::PATCH,
        &format!("/city/id/{}", id),
        Some(json!({"population": 710000})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(updated[0]["population"], 710000);
    assert_eq!(updated[0]["name"], "Oslo");

    let (status, deleted) = send(&router, Method::DELETE, &format!("/city/id/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted.as_array().map(Vec::len), Some(1));

    let (_, rows) = send(&router, Method::GET, "/city", None).await;
    assert_eq!(rows, json!([]));

    fixture.teardown().await;
}

#[tokio::test]
async fn search_order_and_limit() {
    let Some(fixture) = Fixture::create(2).await else { return };
    let router = fixture.engine(&[]).await.router();
    for name in ["Bergen", "Oslo", "Tromso"] {
        let (status, _) = send(&router, Method::POST, "/city", Some(json!({"name": name}))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, rows) = send(&router, Method::GET, "/city/search/name/Oslo", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows.as_array().map(Vec::len), Some(1));

    let (_, rows) = send(&router, Method::GET, "/city/order/name/desc/limit/2", None).await;
    let names: Vec<&str> = rows.as_array().unwrap().iter().filter_map(|r| r["name"].as_str()).collect();
    assert_eq!(names, vec!["Tromso", "Oslo"]);

    let (status, _) = send(&router, Method::GET, "/city/search/nonexistent/1", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    fixture.teardown().await;
}

#[tokio::test]
async fn views_are_read_only_and_describe_marks_keys() {
    let Some(fixture) = Fixture::create(2).await else { return };
    let router = fixture.engine(&["secret"]).await.router();

    let (status, _) = send(&router, Method::GET, "/v_city", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&router, Method::POST, "/v_city", Some(json!({"name": "Oslo"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, columns) = send(&router, Method::GET, "/city/describe", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(columns[0]["field"], "id");
    assert_eq!(columns[0]["key"], "PRI");
    assert_eq!(columns[1]["field"], "name");
    assert_eq!(columns[1]["key"], "");

    let (status, freshness) = send(&router, Method::GET, "/city/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(freshness["table"], "city");
    assert!(freshness["updated_at"].is_string());

    fixture.teardown().await;
}

#[tokio::test]
async fn concurrent_requests_share_a_small_pool() {
    let Some(fixture) = Fixture::create(2).await else { return };
    let router = fixture.engine(&[]).await.router();

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..12 {
        let router = router.clone();
        tasks.spawn(async move { send(&router, Method::GET, "/city", None).await.0 });
    }
    while let Some(status) = tasks.join_next().await {
        assert_eq!(status.unwrap(), StatusCode::OK);
    }

    assert!(fixture.pool.size() <= 2);
    // Connections go back to the pool from a background task after each statement.
    for _ in 0..50 {
        if fixture.pool.num_idle() as u32 == fixture.pool.size() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert_eq!(fixture.pool.num_idle() as u32, fixture.pool.size());

    fixture.teardown().await;
}

#[tokio::test]
async fn keys_compare_on_the_column_type() {
    let Some(fixture) = Fixture::create(2).await else { return };
    let ddl = format!(
        r#"
        CREATE TABLE "{s}"."token" (id uuid PRIMARY KEY, label text);
        INSERT INTO "{s}"."token" VALUES ('a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11', 'first');
        "#,
        s = fixture.schema
    );
    sqlx::raw_sql(&ddl).execute(&fixture.pool).await.unwrap();
    let router = fixture.engine(&[]).await.router();
    let upper = "/token/id/A0EEBC99-9C0B-4EF8-BB6D-6BB9BD380A11";

    let (status, rows) = send(&router, Method::GET, upper, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        rows,
        json!([{"id": "a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11", "label": "first"}])
    );

    let (status, updated) = send(&router, Method::PATCH, upper, Some(json!({"label": "renamed"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(updated[0]["label"], "renamed");

    let (_, created) = send(&router, Method::POST, "/city", Some(json!({"name": "Oslo"}))).await;
    let id = created[0]["id"].as_i64().expect("generated id");
    let (_, rows) = send(&router, Method::GET, &format!("/city/id/00{}", id), None).await;
    assert_eq!(rows.as_array().map(Vec::len), Some(1));

    let (status, deleted) = send(&router, Method::DELETE, upper, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted.as_array().map(Vec::len), Some(1));

    let (status, _) = send(&router, Method::GET, "/token/id/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    fixture.teardown().await;
}

#[tokio::test]
async fn keyed_statements_use_the_primary_key_index() {
    let Some(fixture) = Fixture::create(2).await else { return };
    let engine = fixture.engine(&[]).await;
    let city = engine.registry().get("city").expect("city registered").clone();
    let params = CrudParams {
        key: Some("id".into()),
        id: Some("7".into()),
        ..CrudParams::default()
    };

    let mut conn = fixture.pool.acquire().await.unwrap();
    sqlx::raw_sql("SET enable_seqscan = off").execute(&mut *conn).await.unwrap();
    for op in [Operation::ReadByKey, Operation::Delete] {
        let statement = build(&city, op, &params).unwrap();
        let sql = format!("EXPLAIN {}", statement.sql);
        let mut explain = sqlx::query(&sql);
        for p in &statement.params {
            explain = explain.bind(p.clone());
        }
        let plan = explain
            .fetch_all(&mut *conn)
            .await
            .unwrap()
            .iter()
            .map(|row| row.get::<String, _>(0))
            .collect::<Vec<_>>()
            .join("\n");
        assert!(plan.contains("Index"), "{:?}: {}", op, plan);
        assert!(!plan.contains("Seq Scan"), "{:?}: {}", op, plan);
    }
    sqlx::raw_sql("RESET enable_seqscan").execute(&mut *conn).await.unwrap();
    drop(conn);

    fixture.teardown().await;
}

#[tokio::test]
async fn status_reports_commit_time_or_probe() {
    let Some(fixture) = Fixture::create(2).await else { return };
    let router = fixture.engine(&[]).await.router();
    let (status, _) = send(&router, Method::POST, "/city", Some(json!({"name": "Oslo"}))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, freshness) = send(&router, Method::GET, "/city/status", None).await;
    assert_eq!(status, StatusCode::OK);
    let updated_at = freshness["updated_at"].as_str().expect("timestamp");
    let updated_at = chrono::DateTime::parse_from_rfc3339(updated_at).expect("rfc3339");
    let age = chrono::Utc::now().signed_duration_since(updated_at);
    assert!(age < chrono::Duration::minutes(5), "{}", freshness);

    let tracking: Option<String> = sqlx::query_scalar("SELECT current_setting('track_commit_timestamp', true)")
        .fetch_one(&fixture.pool)
        .await
        .unwrap();
    let expected = if tracking.as_deref() == Some("on") { "commit_timestamp" } else { "probe" };
    assert_eq!(freshness["source"], expected);

    fixture.teardown().await;
}
