//! Integration tests for the console service HTTP API.
//!
//! Uses axum-test to drive the router without binding a socket.

#![allow(clippy::unwrap_used, clippy::panic)]

use axum::body::Body;
use axum::http::{HeaderValue, Request, StatusCode, header};
use axum_test::TestServer;
use serde_json::{Value, json};
use teleporter_console::api::{
    AppState, CategoriesResponse, ErrorResponse, HealthResponse, MAX_BODY_BYTES, RangeResponse,
    RefreshResponse, RemoveResponse, SequenceResponse, ServerSettings, create_router,
};
use teleporter_core::{ChangeAction, KeyedValue, SchemaVersion};
use tower::ServiceExt;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn open_settings() -> ServerSettings {
    ServerSettings {
        api_key: None,
        rate_limit: 0,
        cors_origins: None,
    }
}

fn create_test_server() -> (TestServer, AppState) {
    let state = AppState::in_memory();
    let router = create_router(state.clone(), &open_settings());
    (TestServer::new(router).unwrap(), state)
}

fn create_auth_test_server(api_key: &str) -> TestServer {
    let settings = ServerSettings {
        api_key: Some(api_key.to_string()),
        ..open_settings()
    };
    TestServer::new(create_router(AppState::in_memory(), &settings)).unwrap()
}

async fn put(server: &TestServer, space: &str, key: &str, value: Value) -> KeyedValue<Value> {
    let response = server
        .post(&format!("/{}/entry", space))
        .json(&json!({ "key": key, "value": value }))
        .await;
    response.assert_status_ok();
    response.json()
}

// =============================================================================
// HEALTH
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _) = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// ENTRY ENDPOINTS
// =============================================================================

#[tokio::test]
async fn test_put_then_get() {
    let (server, _) = create_test_server();

    let stored = put(&server, "config", "/task/ns1/t1", json!({"key": "t1"})).await;
    assert_eq!(stored.key, "/task/ns1/t1");
    assert_eq!(stored.version, 1);

    let response = server
        .get("/config/entry")
        .add_query_param("key", "/task/ns1/t1")
        .await;
    response.assert_status_ok();
    let entry: KeyedValue<Value> = response.json();
    assert_eq!(entry.value, json!({"key": "t1"}));
    assert_eq!(entry.version, 1);
}

#[tokio::test]
async fn test_overwrite_bumps_version() {
    let (server, _) = create_test_server();

    put(&server, "config", "/task/ns1/t1", json!({"key": "t1"})).await;
    let second = put(&server, "config", "/task/ns1/t1", json!({"key": "t1", "description": "x"})).await;
    assert_eq!(second.version, 2);
}

#[tokio::test]
async fn test_get_missing_is_404() {
    let (server, _) = create_test_server();

    let response = server
        .get("/config/entry")
        .add_query_param("key", "/task/ns1/absent")
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let error: ErrorResponse = response.json();
    assert_eq!(error.key.as_deref(), Some("/task/ns1/absent"));
}

#[tokio::test]
async fn test_invalid_key_is_400() {
    let (server, _) = create_test_server();

    let response = server
        .post("/config/entry")
        .json(&json!({ "key": "task/no-leading-slash", "value": {} }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_spaces_are_independent() {
    let (server, _) = create_test_server();

    put(&server, "runtime", "/variable/ns1/v1", json!({"keys": [], "timestamp": 7})).await;

    let response = server
        .get("/config/entry")
        .add_query_param("key", "/variable/ns1/v1")
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = server
        .get("/runtime/entry")
        .add_query_param("key", "/variable/ns1/v1")
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_unknown_space_is_404() {
    let (server, _) = create_test_server();

    let response = server
        .get("/scratch/entry")
        .add_query_param("key", "/task/ns1/t1")
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

// =============================================================================
// RANGE ENDPOINT
// =============================================================================

#[tokio::test]
async fn test_range_respects_segment_boundary() {
    let (server, _) = create_test_server();

    put(&server, "config", "/task/ns1/a", json!({})).await;
    put(&server, "config", "/task/ns1/b", json!({})).await;
    put(&server, "config", "/task/ns10/c", json!({})).await;

    let response = server
        .get("/config/range")
        .add_query_param("prefix", "/task/ns1")
        .await;
    response.assert_status_ok();
    let listing: RangeResponse = response.json();
    let keys: Vec<&str> = listing.entries.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["/task/ns1/a", "/task/ns1/b"]);
}

#[tokio::test]
async fn test_range_paging() {
    let (server, _) = create_test_server();

    for name in ["a", "b", "c", "d"] {
        put(&server, "config", &format!("/task/ns1/{}", name), json!({})).await;
    }

    let response = server
        .get("/config/range")
        .add_query_param("prefix", "/task/ns1")
        .add_query_param("offset", 1)
        .add_query_param("limit", 2)
        .await;
    let listing: RangeResponse = response.json();
    let keys: Vec<&str> = listing.entries.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["/task/ns1/b", "/task/ns1/c"]);
}

#[tokio::test]
async fn test_range_defaults_to_root() {
    let (server, _) = create_test_server();

    put(&server, "config", "/address/ns1/a", json!({})).await;
    put(&server, "config", "/task/ns1/t", json!({})).await;

    let listing: RangeResponse = server.get("/config/range").await.json();
    assert_eq!(listing.entries.len(), 2);
}

// =============================================================================
// ATOMIC PUT
// =============================================================================

#[tokio::test]
async fn test_atomic_put_create_and_update() {
    let (server, _) = create_test_server();

    let created = server
        .post("/config/entry/atomic")
        .json(&json!({ "key": "/task/ns1/t1", "value": {}, "expected_version": null }))
        .await;
    created.assert_status_ok();
    let created: KeyedValue<Value> = created.json();
    assert_eq!(created.version, 1);

    let updated = server
        .post("/config/entry/atomic")
        .json(&json!({ "key": "/task/ns1/t1", "value": {"a": 1}, "expected_version": 1 }))
        .await;
    updated.assert_status_ok();
    let updated: KeyedValue<Value> = updated.json();
    assert_eq!(updated.version, 2);
}

#[tokio::test]
async fn test_atomic_put_stale_version_is_409() {
    let (server, _) = create_test_server();

    put(&server, "config", "/task/ns1/t1", json!({})).await;

    let response = server
        .post("/config/entry/atomic")
        .json(&json!({ "key": "/task/ns1/t1", "value": {}, "expected_version": 5 }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let error: ErrorResponse = response.json();
    assert_eq!(error.key.as_deref(), Some("/task/ns1/t1"));
    assert_eq!(error.expected_version, Some(5));
    assert_eq!(error.actual_version, Some(1));
}

#[tokio::test]
async fn test_atomic_create_over_existing_is_409() {
    let (server, _) = create_test_server();

    put(&server, "config", "/task/ns1/t1", json!({})).await;

    let response = server
        .post("/config/entry/atomic")
        .json(&json!({ "key": "/task/ns1/t1", "value": {} }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
}

// =============================================================================
// DELETE
// =============================================================================

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (server, _) = create_test_server();

    put(&server, "config", "/task/ns1/t1", json!({})).await;

    let first: RemoveResponse = server
        .delete("/config/entry")
        .add_query_param("key", "/task/ns1/t1")
        .await
        .json();
    assert!(first.removed);

    let second = server
        .delete("/config/entry")
        .add_query_param("key", "/task/ns1/t1")
        .await;
    second.assert_status_ok();
    let second: RemoveResponse = second.json();
    assert!(!second.removed);
}

#[tokio::test]
async fn test_recreated_entry_continues_versions() {
    let (server, _) = create_test_server();

    put(&server, "config", "/task/ns1/t1", json!({})).await;
    server
        .delete("/config/entry")
        .add_query_param("key", "/task/ns1/t1")
        .await
        .assert_status_ok();

    let recreated = put(&server, "config", "/task/ns1/t1", json!({})).await;
    assert_eq!(recreated.version, 2);

    let stale = server
        .post("/config/entry/atomic")
        .json(&json!({ "key": "/task/ns1/t1", "value": {}, "expected_version": 1 }))
        .await;
    stale.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_oversized_body_is_413() {
    let router = create_router(AppState::in_memory(), &open_settings());
    let body = json!({ "key": "/task/ns1/t1", "value": "x".repeat(MAX_BODY_BYTES) }).to_string();

    let response = router
        .oneshot(
            Request::post("/config/entry")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

// =============================================================================
// ID SEQUENCE
// =============================================================================

#[tokio::test]
async fn test_sequence_hands_out_increasing_ids() {
    let (server, _) = create_test_server();

    let first: SequenceResponse = server.post("/config/sequence").await.json();
    let second: SequenceResponse = server.post("/config/sequence").await.json();

    assert_eq!(first.id, 1);
    assert_eq!(second.id, 2);
}

#[tokio::test]
async fn test_sequence_requires_auth() {
    let server = create_auth_test_server("secret");

    server
        .post("/config/sequence")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

// =============================================================================
// REFRESH + NOTIFICATIONS
// =============================================================================

#[tokio::test]
async fn test_refresh_is_accepted_and_published() {
    let (server, state) = create_test_server();
    let mut changes = state.subscribe();

    let response = server
        .post("/config/refresh")
        .json(&json!({ "key": "/task/ns1/t1" }))
        .await;

    response.assert_status(StatusCode::ACCEPTED);
    let body: RefreshResponse = response.json();
    assert_eq!(body.key, "/task/ns1/t1");

    let notify = changes.recv().await.unwrap();
    assert_eq!(notify.key, "/task/ns1/t1");
    assert_eq!(notify.action, ChangeAction::Refresh);
}

#[tokio::test]
async fn test_config_writes_are_published_runtime_writes_are_not() {
    let (server, state) = create_test_server();
    let mut changes = state.subscribe();

    put(&server, "runtime", "/variable/ns1/v1", json!({})).await;
    put(&server, "config", "/variable/ns1/v1", json!({})).await;
    server
        .delete("/config/entry")
        .add_query_param("key", "/variable/ns1/v1")
        .await
        .assert_status_ok();

    let first = changes.recv().await.unwrap();
    assert_eq!(first.action, ChangeAction::Upsert);
    let second = changes.recv().await.unwrap();
    assert_eq!(second.action, ChangeAction::Remove);
    assert!(changes.try_recv().is_err());
}

#[tokio::test]
async fn test_refresh_rejects_invalid_key() {
    let (server, _) = create_test_server();

    let response = server
        .post("/config/refresh")
        .json(&json!({ "key": "" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

// =============================================================================
// SCHEMA ENDPOINTS
// =============================================================================

#[tokio::test]
async fn test_categories_for_address() {
    let (server, _) = create_test_server();

    let response = server.get("/categories/address").await;

    response.assert_status_ok();
    let categories: CategoriesResponse = response.json();
    assert_eq!(categories.version, SchemaVersion::V1);
    assert!(categories.categories.iter().any(|c| c == "kafka_consumer"));
}

#[tokio::test]
async fn test_categories_for_task_is_empty() {
    let (server, _) = create_test_server();

    let categories: CategoriesResponse = server.get("/categories/task").await.json();
    assert!(categories.categories.is_empty());
}

#[tokio::test]
async fn test_schema_resolves_client_group() {
    let (server, _) = create_test_server();

    let response = server
        .get("/schema/address")
        .add_query_param("category", "kafka_consumer")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["category"], "kafka_consumer");
    let fields = body["fields"].as_array().unwrap();
    assert!(fields.iter().any(|f| f["key"] == "client"));
    assert!(fields.iter().any(|f| f["key"] == "category"));
}

#[tokio::test]
async fn test_schema_unknown_category_is_400() {
    let (server, _) = create_test_server();

    let response = server
        .get("/schema/address")
        .add_query_param("category", "carrier_pigeon")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let error: ErrorResponse = response.json();
    assert!(error.error.contains("carrier_pigeon"));
}

#[tokio::test]
async fn test_schema_missing_category_is_400() {
    let (server, _) = create_test_server();

    let response = server.get("/schema/sink").await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

// =============================================================================
// AUTHENTICATION
// =============================================================================

#[tokio::test]
async fn test_auth_valid_bearer_token() {
    let api_key = "test-secret-key-12345";
    let server = create_auth_test_server(api_key);

    let response = server
        .get("/config/range")
        .add_header(
            axum::http::header::AUTHORIZATION,
            format!("Bearer {}", api_key)
                .parse::<HeaderValue>()
                .unwrap(),
        )
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_missing_token_rejected() {
    let server = create_auth_test_server("correct-key");

    let response = server.get("/config/range").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let error: ErrorResponse = response.json();
    assert!(!error.error.is_empty());
}

#[tokio::test]
async fn test_auth_invalid_token_rejected() {
    let server = create_auth_test_server("correct-key");

    let response = server
        .get("/categories/address")
        .add_header(
            axum::http::header::AUTHORIZATION,
            "Bearer wrong-key".parse::<HeaderValue>().unwrap(),
        )
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_health_exempt() {
    let server = create_auth_test_server("correct-key");

    let response = server.get("/health").await;

    response.assert_status_ok();
}
