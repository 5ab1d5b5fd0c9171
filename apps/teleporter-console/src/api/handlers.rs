//! # API Endpoint Handlers

use super::{
    AppState,
    types::{
        ApiError, AtomicPutRequest, CategoriesResponse, EntryQuery, HealthResponse, PutRequest,
        RangeQuery, RangeResponse, RefreshRequest, RefreshResponse, RemoveResponse, SchemaQuery,
        SchemaResponse, SequenceResponse,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::Value;
use teleporter_core::{ConsoleError, EntityKind, KeyedValue, Space};

// =============================================================================
// HEALTH HANDLER
// =============================================================================

pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// KEY SPACE HANDLERS
// =============================================================================
//
// Mounted once per space by `space_routes`, which supplies `space`.

pub async fn get_entry(
    state: AppState,
    space: Space,
    query: EntryQuery,
) -> Result<Json<KeyedValue<Value>>, ApiError> {
    state
        .get(space, &query.key)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError(ConsoleError::NotFound(query.key)))
}

pub async fn range_entries(
    state: AppState,
    space: Space,
    query: RangeQuery,
) -> Result<Json<RangeResponse>, ApiError> {
    let entries = state
        .range(space, &query.prefix, query.offset, query.limit)
        .await?;
    Ok(Json(RangeResponse { entries }))
}

pub async fn put_entry(
    state: AppState,
    space: Space,
    request: PutRequest,
) -> Result<Json<KeyedValue<Value>>, ApiError> {
    Ok(Json(state.save(space, &request.key, request.value).await?))
}

pub async fn atomic_put_entry(
    state: AppState,
    space: Space,
    request: AtomicPutRequest,
) -> Result<Json<KeyedValue<Value>>, ApiError> {
    let stored = state
        .save_if_version(space, &request.key, request.value, request.expected_version)
        .await?;
    Ok(Json(stored))
}

/// Deleting an absent key succeeds with `removed: false`.
pub async fn remove_entry(
    state: AppState,
    space: Space,
    query: EntryQuery,
) -> Result<Json<RemoveResponse>, ApiError> {
    let removed = state.remove(space, &query.key).await?;
    Ok(Json(RemoveResponse { removed }))
}

pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.refresh(&request.key).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(RefreshResponse { key: request.key }),
    ))
}

pub async fn sequence_handler(
    State(state): State<AppState>,
) -> Result<Json<SequenceResponse>, ApiError> {
    let id = state.next_id().await?;
    Ok(Json(SequenceResponse { id }))
}

// =============================================================================
// SCHEMA HANDLERS
// =============================================================================

pub async fn categories_handler(
    State(state): State<AppState>,
    Path(kind): Path<EntityKind>,
) -> Json<CategoriesResponse> {
    Json(CategoriesResponse {
        kind,
        version: state.registry.version(),
        categories: state
            .registry
            .categories(kind)
            .into_iter()
            .map(String::from)
            .collect(),
    })
}

pub async fn schema_handler(
    State(state): State<AppState>,
    Path(kind): Path<EntityKind>,
    Query(query): Query<SchemaQuery>,
) -> Result<Json<SchemaResponse>, ApiError> {
    let fields = state
        .registry
        .resolve_form_schema(kind, query.category.as_deref())?;
    Ok(Json(SchemaResponse {
        kind,
        category: query.category,
        version: state.registry.version(),
        fields,
    }))
}
