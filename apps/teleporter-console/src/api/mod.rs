//! # Console Service HTTP API
//!
//! axum service exposing the versioned key space and the schema registry.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /{space}/entry?key=` - Point lookup
//! - `POST /{space}/entry` - Unconditional upsert
//! - `POST /{space}/entry/atomic` - Compare-and-set upsert
//! - `DELETE /{space}/entry?key=` - Idempotent delete
//! - `GET /{space}/range?prefix=&offset=&limit=` - Prefix listing
//! - `POST /config/refresh` - Ask the processing engine to reload a key
//! - `POST /config/sequence` - Allocate the next entity id
//! - `GET /categories/{kind}` - Known categories of an entity kind
//! - `GET /schema/{kind}?category=` - Resolved form schema
//!
//! `{space}` is `config` or `runtime`.

mod auth;
mod handlers;
mod middleware;
pub mod types;

pub use auth::ApiKey;
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{
    ApiError, AtomicPutRequest, CategoriesResponse, EntryQuery, ErrorResponse, HealthResponse,
    PutRequest, RangeQuery, RangeResponse, RefreshRequest, RefreshResponse, RemoveResponse,
    SchemaResponse, SequenceResponse,
};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use serde_json::Value;
use std::sync::Arc;
use teleporter_core::keyspace::validate_key;
use teleporter_core::{
    ChangeAction, ConfigChangeNotify, ConsoleError, KeyedValue, Keyspace, KvStore, SchemaRegistry,
    Space,
};
use tokio::sync::{RwLock, broadcast};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Buffered notifications per subscriber before the oldest are dropped.
const NOTIFY_CAPACITY: usize = 256;

/// Maximum request body (values are capped at 4 MB in the store).
pub const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared service state: the key space, the registry and the change channel.
#[derive(Clone)]
pub struct AppState {
    pub keyspace: Arc<RwLock<Keyspace>>,
    pub registry: Arc<SchemaRegistry>,
    notifier: broadcast::Sender<ConfigChangeNotify>,
}

impl AppState {
    #[must_use]
    pub fn new(keyspace: Keyspace, registry: SchemaRegistry) -> Self {
        let (notifier, _) = broadcast::channel(NOTIFY_CAPACITY);
        Self {
            keyspace: Arc::new(RwLock::new(keyspace)),
            registry: Arc::new(registry),
            notifier,
        }
    }

    /// In-memory key space with the default registry.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Keyspace::new(), SchemaRegistry::new())
    }

    /// Receive every config change published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ConfigChangeNotify> {
        self.notifier.subscribe()
    }

    fn publish(&self, key: &str, action: ChangeAction) {
        let notify = ConfigChangeNotify::now(key, action);
        if self.notifier.send(notify).is_err() {
            tracing::debug!(key, ?action, "no change subscribers");
        }
    }

    pub async fn get(
        &self,
        space: Space,
        key: &str,
    ) -> Result<Option<KeyedValue<Value>>, ConsoleError> {
        self.keyspace.read().await.get(space, key)
    }

    pub async fn range(
        &self,
        space: Space,
        prefix: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<KeyedValue<Value>>, ConsoleError> {
        self.keyspace.read().await.range(space, prefix, offset, limit)
    }

    pub async fn save(
        &self,
        space: Space,
        key: &str,
        value: Value,
    ) -> Result<KeyedValue<Value>, ConsoleError> {
        let stored = self.keyspace.write().await.put(space, key, value)?;
        tracing::info!(%space, key, version = stored.version, "entry saved");
        if space == Space::Config {
            self.publish(key, ChangeAction::Upsert);
        }
        Ok(stored)
    }

    pub async fn save_if_version(
        &self,
        space: Space,
        key: &str,
        value: Value,
        expected: Option<u64>,
    ) -> Result<KeyedValue<Value>, ConsoleError> {
        let stored = self
            .keyspace
            .write()
            .await
            .put_if_version(space, key, value, expected)?;
        tracing::info!(%space, key, version = stored.version, "entry saved (versioned)");
        if space == Space::Config {
            self.publish(key, ChangeAction::Upsert);
        }
        Ok(stored)
    }

    pub async fn remove(&self, space: Space, key: &str) -> Result<bool, ConsoleError> {
        let removed = self.keyspace.write().await.remove(space, key)?;
        tracing::info!(%space, key, removed, "entry removed");
        if removed && space == Space::Config {
            self.publish(key, ChangeAction::Remove);
        }
        Ok(removed)
    }

    /// Allocate the next entity id.
    pub async fn next_id(&self) -> Result<u64, ConsoleError> {
        let id = self.keyspace.write().await.next_id()?;
        tracing::debug!(id, "entity id allocated");
        Ok(id)
    }

    /// Publish a refresh for `key`. The key need not exist.
    pub async fn refresh(&self, key: &str) -> Result<(), ConsoleError> {
        validate_key(key)?;
        tracing::info!(key, "refresh requested");
        self.publish(key, ChangeAction::Refresh);
        Ok(())
    }
}

/// Router-level settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub api_key: Option<String>,
    /// Requests per second; `0` disables limiting.
    pub rate_limit: u32,
    /// `None` allows localhost only; `["*"]` allows every origin.
    pub cors_origins: Option<Vec<String>>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            rate_limit: 100,
            cors_origins: None,
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const CORS_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];

fn build_cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let Some(origins) = origins else {
        tracing::info!("CORS: no origins configured, allowing localhost only");
        return build_localhost_cors();
    };

    if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS: allowing ALL origins. Do not use this in production");
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("CORS: invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        tracing::warn!("CORS: no valid origins configured, allowing localhost only");
        return build_localhost_cors();
    }

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Entry and range routes of one space, mounted under `/{space}`.
fn space_routes(space: Space) -> Router<AppState> {
    Router::new()
        .route(
            "/entry",
            get(
                move |State(state): State<AppState>, Query(query): Query<EntryQuery>| {
                    handlers::get_entry(state, space, query)
                },
            )
            .post(
                move |State(state): State<AppState>, Json(request): Json<PutRequest>| {
                    handlers::put_entry(state, space, request)
                },
            )
            .delete(
                move |State(state): State<AppState>, Query(query): Query<EntryQuery>| {
                    handlers::remove_entry(state, space, query)
                },
            ),
        )
        .route(
            "/entry/atomic",
            post(
                move |State(state): State<AppState>, Json(request): Json<AtomicPutRequest>| {
                    handlers::atomic_put_entry(state, space, request)
                },
            ),
        )
        .route(
            "/range",
            get(
                move |State(state): State<AppState>, Query(query): Query<RangeQuery>| {
                    handlers::range_entries(state, space, query)
                },
            ),
        )
}

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner): tracing, CORS, body limit, rate
/// limiting (if enabled), authentication (if a key is set).
pub fn create_router(state: AppState, settings: &ServerSettings) -> Router {
    let config_routes = space_routes(Space::Config)
        .route("/refresh", post(handlers::refresh_handler))
        .route("/sequence", post(handlers::sequence_handler));

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .nest("/config", config_routes)
        .nest("/runtime", space_routes(Space::Runtime))
        .route("/categories/{kind}", get(handlers::categories_handler))
        .route("/schema/{kind}", get(handlers::schema_handler));

    match settings.api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => {
            tracing::info!("API key authentication enabled");
            let key: ApiKey = Arc::from(key);
            router = router.layer(axum_middleware::from_fn_with_state(
                key,
                auth::api_key_auth_middleware,
            ));
        }
        None => tracing::warn!(
            "API key authentication DISABLED: set TELEPORTER_API_KEY to protect the service"
        ),
    }

    match create_rate_limiter(settings.rate_limit) {
        Some(limiter) => {
            tracing::info!("Rate limiting enabled: {} requests/second", settings.rate_limit);
            router = router.layer(axum_middleware::from_fn_with_state(
                limiter,
                middleware::rate_limit_middleware,
            ));
        }
        None => tracing::info!("Rate limiting disabled"),
    }

    // ServiceBuilder applies top to bottom: the first layer is outermost.
    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(settings.cors_origins.as_deref()))
                .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Serve until Ctrl+C.
pub async fn run_server(
    addr: &str,
    state: AppState,
    settings: &ServerSettings,
) -> Result<(), ConsoleError> {
    let router = create_router(state, settings);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ConsoleError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Teleporter console service listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ConsoleError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
