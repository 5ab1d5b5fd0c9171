//! HTTP client tests against a live console service on a loopback port.

#![allow(clippy::unwrap_used, clippy::panic)]

use serde_json::{Value, json};
use teleporter_console::api::{AppState, ServerSettings, create_router};
use teleporter_console::client::{
    Address, ConfigStore, HttpTransport, KvTransport, RuntimeStore, Task,
};
use teleporter_console::controller::{AddressController, TaskController};
use teleporter_core::{ConsoleError, EntityValue, Scope, Space};

// =============================================================================
// HELPERS
// =============================================================================

fn object(value: Value) -> EntityValue {
    match value {
        Value::Object(map) => map,
        _ => EntityValue::new(),
    }
}

/// Serve a fresh in-memory console on `127.0.0.1:0`, return its base URL.
async fn spawn_service(api_key: Option<&str>) -> (String, AppState) {
    let state = AppState::in_memory();
    let settings = ServerSettings {
        api_key: api_key.map(String::from),
        rate_limit: 0,
        cors_origins: None,
    };
    let router = create_router(state.clone(), &settings);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{}", addr), state)
}

async fn transport() -> (HttpTransport, AppState) {
    let (url, state) = spawn_service(None).await;
    (HttpTransport::new(url, None).unwrap(), state)
}

// =============================================================================
// CONFIG STORE
// =============================================================================

#[tokio::test]
async fn config_store_crud_round_trip() {
    let (transport, _) = transport().await;
    let tasks: ConfigStore<Task, _> = ConfigStore::new(transport);

    let saved = tasks
        .save("/task/ns1/t1", &object(json!({ "key": "t1", "name": "ingest" })))
        .await
        .unwrap();
    assert_eq!(saved.version, 1);

    let found = tasks.find_one("/task/ns1/t1").await.unwrap();
    assert_eq!(found.value["name"], json!("ingest"));

    let listed = tasks.list(&Scope::namespace("ns1")).await.unwrap();
    assert_eq!(listed.len(), 1);

    assert!(tasks.remove("/task/ns1/t1").await.unwrap());
    assert!(!tasks.remove("/task/ns1/t1").await.unwrap());
}

#[tokio::test]
async fn missing_entry_maps_to_not_found() {
    let (transport, _) = transport().await;
    let tasks: ConfigStore<Task, _> = ConfigStore::new(transport.clone());

    assert_eq!(
        tasks.find_one("/task/ns1/absent").await,
        Err(ConsoleError::NotFound("/task/ns1/absent".to_string()))
    );
    assert_eq!(transport.get(Space::Config, "/task/ns1/absent").await, Ok(None));
}

#[tokio::test]
async fn stale_version_maps_to_conflict() {
    let (transport, _) = transport().await;
    let tasks: ConfigStore<Task, _> = ConfigStore::new(transport);
    let value = object(json!({ "key": "t1", "name": "ingest" }));

    tasks.save_if_version("/task/ns1/t1", &value, None).await.unwrap();
    let result = tasks.save_if_version("/task/ns1/t1", &value, None).await;

    assert_eq!(
        result,
        Err(ConsoleError::Conflict {
            key: "/task/ns1/t1".to_string(),
            expected: None,
            actual: Some(1),
        })
    );
}

#[tokio::test]
async fn invalid_key_is_a_remote_failure() {
    let (transport, _) = transport().await;

    let result = transport
        .put(Space::Config, "/task//t1", json!({}))
        .await;

    assert!(matches!(result, Err(ConsoleError::RemoteFailure(_))));
}

#[tokio::test]
async fn range_honors_offset_and_limit() {
    let (transport, _) = transport().await;
    for name in ["a", "b", "c", "d", "e"] {
        transport
            .put(Space::Config, &format!("/task/ns1/{}", name), json!({}))
            .await
            .unwrap();
    }

    let page = transport
        .range(Space::Config, "/task/ns1", 2, 2)
        .await
        .unwrap();
    let keys: Vec<&str> = page.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["/task/ns1/c", "/task/ns1/d"]);
}

#[tokio::test]
async fn refresh_reaches_subscribers() {
    let (transport, state) = transport().await;
    let mut changes = state.subscribe();

    transport.refresh("/task/ns1/t1").await.unwrap();

    let notify = changes.recv().await.unwrap();
    assert_eq!(notify.key, "/task/ns1/t1");
}

#[tokio::test]
async fn ids_come_from_the_service_sequence() {
    let (transport, state) = transport().await;

    assert_eq!(transport.next_id().await.unwrap(), 1);
    assert_eq!(state.next_id().await.unwrap(), 2);
    assert_eq!(transport.next_id().await.unwrap(), 3);
}

#[tokio::test]
async fn wrong_base_path_is_not_an_absent_entry() {
    let (url, _) = spawn_service(None).await;
    let transport = HttpTransport::new(format!("{}/console", url), None).unwrap();

    assert!(matches!(
        transport.get(Space::Config, "/task/ns1/t1").await,
        Err(ConsoleError::RemoteFailure(_))
    ));

    let tasks = TaskController::new(transport, AppState::in_memory().registry);
    let result = tasks
        .apply(
            &Scope::namespace("ns1"),
            None,
            &object(json!({ "key": "t1", "name": "ingest" })),
        )
        .await;
    assert!(matches!(result, Err(ConsoleError::RemoteFailure(_))));
}

// =============================================================================
// RUNTIME STORE
// =============================================================================

#[tokio::test]
async fn owners_and_lookup_many() {
    let (transport, _) = transport().await;
    transport
        .put(
            Space::Runtime,
            "/address/ns1/a1/owners",
            json!({ "keys": ["w1", "w2"], "timestamp": 5 }),
        )
        .await
        .unwrap();
    transport
        .put(Space::Runtime, "/variable/ns1/v1", json!({ "timestamp": 9 }))
        .await
        .unwrap();

    let runtime = RuntimeStore::new(transport);
    let owners = runtime.owners("ns1", "a1").await.unwrap();
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].value.owner_keys, vec!["w1", "w2"]);

    let keys = vec![
        "/variable/ns1/v0".to_string(),
        "/variable/ns1/v1".to_string(),
    ];
    let rows = runtime.lookup_many(&keys).await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].key, "/variable/ns1/v0");
    assert_eq!(rows[0].record, Ok(None));
    assert_eq!(
        rows[1].record.as_ref().unwrap().as_ref().map(|r| r.value.timestamp),
        Some(9)
    );
}

#[tokio::test]
async fn runtime_find_one_missing_is_not_found() {
    let (transport, _) = transport().await;
    let runtime = RuntimeStore::new(transport);

    assert!(matches!(
        runtime.find_one("/variable/ns1/absent").await,
        Err(ConsoleError::NotFound(_))
    ));
}

// =============================================================================
// AUTHENTICATION
// =============================================================================

#[tokio::test]
async fn wrong_api_key_is_a_remote_failure() {
    let (url, _) = spawn_service(Some("server-key")).await;
    let transport = HttpTransport::new(url, Some("client-key".to_string())).unwrap();

    let result = transport.get(Space::Config, "/task/ns1/t1").await;

    match result {
        Err(ConsoleError::RemoteFailure(message)) => assert!(message.contains("Unauthorized")),
        other => panic!("expected unauthorized, got {:?}", other),
    }
}

#[tokio::test]
async fn matching_api_key_is_accepted() {
    let (url, _) = spawn_service(Some("server-key")).await;
    let transport = HttpTransport::new(url, Some("server-key".to_string())).unwrap();

    assert_eq!(transport.get(Space::Config, "/task/ns1/t1").await, Ok(None));
}

#[tokio::test]
async fn unreachable_service_is_a_remote_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let transport = HttpTransport::new(format!("http://{}", addr), None).unwrap();

    assert!(matches!(
        transport.range(Space::Config, "/", 0, 10).await,
        Err(ConsoleError::RemoteFailure(_))
    ));
}

// =============================================================================
// CONTROLLER OVER HTTP
// =============================================================================

#[tokio::test]
async fn address_lifecycle_over_http() {
    let (transport, state) = transport().await;
    let addresses = AddressController::new(transport.clone(), state.registry.clone());
    let scope = Scope::namespace("ns1");

    let stored = addresses
        .apply(
            &scope,
            Some("kafka_producer"),
            &object(json!({ "key": "out", "client": { "bootstrap.servers": "b:9092" } })),
        )
        .await
        .unwrap();
    assert_eq!(stored.key, "/address/ns1/out");
    assert_eq!(stored.value["id"], json!(1));

    transport
        .put(Space::Runtime, "/address/ns1/out/owners", json!({ "keys": ["t1"] }))
        .await
        .unwrap();
    addresses.delete(&stored.key).await.unwrap();

    let leftover: ConfigStore<Address, _> = ConfigStore::new(transport.clone());
    assert!(leftover.list(&scope).await.unwrap().is_empty());
    assert_eq!(
        transport.get(Space::Runtime, "/address/ns1/out/owners").await,
        Ok(None)
    );
}
