use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use padawan_core::domain::model::ConnectionProfile;
use padawan_core::infra::cache::{CacheGateway, MemoryStore};
use padawan_core::infra::relational::RelationalGateway;
use padawan_server::auth::{hash_password, Credentials};
use padawan_server::{router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn sqlite_gateway() -> RelationalGateway {
    RelationalGateway::connect(
        ConnectionProfile::new("localhost", 0)
            .with_extra("dialect", "sqlite")
            .with_extra("path", ":memory:"),
    )
    .await
}

async fn unreachable_postgres() -> RelationalGateway {
    RelationalGateway::connect(
        ConnectionProfile::new("127.0.0.1", 1)
            .with_extra("dialect", "postgres")
            .with_extra("timeout_ms", "300"),
    )
    .await
}

fn state_with(relational: RelationalGateway) -> AppState {
    let cache = CacheGateway::with_store(Arc::new(MemoryStore::new()), Duration::from_secs(1));
    let credentials = Credentials {
        username: "admin".to_string(),
        password_hash: hash_password("password").unwrap(),
    };
    AppState::new(Arc::new(cache), Arc::new(relational), credentials)
}

async fn app() -> (Router, AppState) {
    let state = state_with(sqlite_gateway().await);
    (router(state.clone()), state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn json_post(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn form_post(uri: &str, body: &str, auth: Option<(&str, &str)>) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some((user, pass)) = auth {
        builder = builder.header(
            header::AUTHORIZATION,
            format!("Basic {}", STANDARD.encode(format!("{user}:{pass}"))),
        );
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn luke(redis: bool, persist: bool) -> Value {
    json!({
        "payload": { "username": "luke", "email": "luke@rebellion.org" },
        "redis": redis,
        "persist": persist,
    })
}

#[tokio::test]
async fn health_says_ok() {
    let (app, _) = app().await;
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn redis_submit_without_persist_touches_only_the_cache() {
    let (app, state) = app().await;

    let (status, body) = send(&app, json_post("/redis-rest-submit", luke(true, false))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"]["state"], "successful");
    assert_eq!(body["message"]["redis_status"], "stored");
    assert!(body["message"].get("persist").is_none());

    assert_eq!(
        state.cache.get("luke").await.unwrap().as_deref(),
        Some("luke@rebellion.org")
    );
    assert_eq!(state.cache.get("inserts").await.unwrap().as_deref(), Some("1"));
    assert_eq!(state.inserts(), 2);
    assert!(state.relational.demo_records().await.unwrap().is_empty());
}

#[tokio::test]
async fn persist_inserts_exactly_one_row() {
    let (app, state) = app().await;

    let (status, body) = send(&app, json_post("/redis-rest-submit", luke(true, true))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"]["persist"], "successful");

    let records = state.relational.demo_records().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].username, "luke");
    assert_eq!(records[0].email, "luke@rebellion.org");

    let (status, rows) = send(&app, get("/get-postgres")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows[0]["username"], "luke");
}

#[tokio::test]
async fn plain_submit_only_greets() {
    let (app, state) = app().await;

    let (status, body) = send(&app, json_post("/redis-rest-submit", luke(false, false))).await;
    assert_eq!(status, StatusCode::OK);
    let info = body["message"]["info"].as_str().unwrap();
    assert!(info.contains("young padawan luke"));
    assert!(body["message"].get("redis_status").is_none());
    assert_eq!(state.cache.get("luke").await.unwrap(), None);
    assert_eq!(state.inserts(), 1);
}

#[tokio::test]
async fn counter_advances_per_cached_submit() {
    let (app, state) = app().await;

    for _ in 0..3 {
        let (status, _) = send(&app, json_post("/redis-rest-submit", luke(true, false))).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(state.cache.get("inserts").await.unwrap().as_deref(), Some("3"));
}

#[tokio::test]
async fn bad_payloads_are_rejected() {
    let (app, _) = app().await;

    let cases = [
        (json!({ "redis": true }), "payload key not found"),
        (json!({ "payload": { "username": "luke" } }), "mandatory"),
        (json!({ "payload": { "username": null, "email": "x@y.z" } }), "can't be empty"),
        (json!({ "payload": { "username": "", "email": "x@y.z" } }), "can't be empty"),
    ];
    for (body, expected) in cases {
        let (status, reply) = send(&app, json_post("/redis-rest-submit", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply["message"]["state"], "failure");
        assert!(reply["message"]["error"].as_str().unwrap().contains(expected));
    }

    let garbage = Request::post("/redis-rest-submit")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ nope"))
        .unwrap();
    let (status, reply) = send(&app, garbage).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reply["message"]["state"], "failure");
}

#[tokio::test]
async fn unavailable_backend_degrades() {
    let state = state_with(unreachable_postgres().await);
    let app = router(state.clone());

    let (status, body) = send(&app, json_post("/redis-rest-submit", luke(false, true))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["message"]["state"], "degraded");

    let (status, body) = send(&app, get("/postgres-status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], 0);
    assert!(body["message"].as_str().unwrap().starts_with("Failed to create a connection"));

    let (status, body) = send(&app, get("/get-postgres")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "service_degraded");
}

#[tokio::test]
async fn cache_outage_does_not_block_the_insert() {
    let down = ConnectionProfile::new("127.0.0.1", 1).with_extra("timeout_ms", "300");
    let cache = CacheGateway::connect(&down).await;
    let credentials = Credentials {
        username: "admin".to_string(),
        password_hash: hash_password("password").unwrap(),
    };
    let state = AppState::new(Arc::new(cache), Arc::new(sqlite_gateway().await), credentials);
    let app = router(state.clone());

    let (status, body) = send(&app, json_post("/redis-rest-submit", luke(true, true))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"]["state"], "successful");
    assert_eq!(body["message"]["redis_status"], "degraded");
    assert_eq!(body["message"]["persist"], "successful");
    assert!(body["message"]["error"].is_string());

    let records = state.relational.demo_records().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].username, "luke");

    // Nothing requested landed: the outage is the answer.
    let (status, body) = send(&app, json_post("/redis-rest-submit", luke(true, false))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["message"]["state"], "degraded");
}

#[tokio::test]
async fn pending_cache_error_still_persists_the_form() {
    let (app, state) = app().await;
    state.cache.append_to_list("jedi", "yoda").await.unwrap();
    assert!(state.cache.get("jedi").await.is_err());

    let (status, body) = send(
        &app,
        form_post(
            "/redis-submit/",
            "username=han&useremail=han%40falcon.org&persist=on",
            Some(("admin", "password")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"]["redis_status"], "degraded");
    assert_eq!(body["message"]["persist"], "successful");
    assert!(state.cache.get("han").await.unwrap().is_none());
    assert!(state.cache.check_error().is_none());
    assert_eq!(state.relational.demo_records().await.unwrap().len(), 1);
}

#[tokio::test]
async fn authenticate_requires_basic_credentials() {
    let (app, _) = app().await;

    let response = app.clone().oneshot(get("/authenticate/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers()[header::WWW_AUTHENTICATE],
        "Basic realm=\"padawan\""
    );

    let wrong = Request::get("/authenticate/")
        .header(
            header::AUTHORIZATION,
            format!("Basic {}", STANDARD.encode("admin:nope")),
        )
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let right = Request::get("/authenticate/")
        .header(
            header::AUTHORIZATION,
            format!("Basic {}", STANDARD.encode("admin:password")),
        )
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, right).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "message": { "state": "success", "message": "Oh Captain, My Captain." } })
    );
}

#[tokio::test]
async fn form_submit_behind_auth_stores_and_persists() {
    let (app, state) = app().await;

    let (status, _) = send(
        &app,
        form_post("/redis-submit/", "username=leia&useremail=leia%40rebels.org", None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        form_post(
            "/redis-submit/",
            "username=leia&useremail=leia%40rebels.org&persist=on",
            Some(("admin", "password")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"]["redis_status"], "stored");
    assert_eq!(body["message"]["persist"], "successful");

    assert_eq!(
        state.cache.get("leia").await.unwrap().as_deref(),
        Some("leia@rebels.org")
    );
    assert_eq!(state.relational.demo_records().await.unwrap().len(), 1);
}

#[tokio::test]
async fn pending_cache_error_is_reported_once() {
    let (app, state) = app().await;
    state.cache.append_to_list("jedi", "yoda").await.unwrap();
    assert!(state.cache.get("jedi").await.is_err());

    let request = || {
        form_post(
            "/redis-submit/",
            "username=han&useremail=han%40falcon.org",
            Some(("admin", "password")),
        )
    };

    let (status, body) = send(&app, request()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["message"]["state"], "degraded");
    assert!(state.cache.check_error().is_none());

    let (status, _) = send(&app, request()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn submit_echoes_the_form() {
    let (app, _) = app().await;

    let (status, body) = send(
        &app,
        form_post("/submit/", "username=obi&useremail=obi%40wan.org", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "name": "obi", "email": "obi@wan.org" }));

    let (status, body) = send(&app, form_post("/submit/", "username=obi", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"]["state"], "failure");
}

#[tokio::test]
async fn cache_views_list_entries_and_info() {
    let (app, state) = app().await;
    state.cache.set("b", "2").await.unwrap();
    state.cache.append_to_list("a", "x").await.unwrap();
    state.cache.append_to_list("a", "y").await.unwrap();

    let (status, body) = send(&app, get("/get-redis")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{ "key": "a", "value": "xy" }, { "key": "b", "value": "2" }])
    );

    let (status, body) = send(&app, get("/redis-status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["backend"], "memory");
}

#[tokio::test]
async fn postgres_status_reports_healthy_connection() {
    let (app, _) = app().await;

    let (status, body) = send(&app, get("/postgres-status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "status": 1, "message": "PostgreSQL Connection Successfully established." })
    );
}
