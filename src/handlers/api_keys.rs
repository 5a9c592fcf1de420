//! API key management HTTP handlers.
//!
//! All routes require a dashboard session token and only ever touch keys
//! created by the session's user:
//! - POST /api/v1/api-keys - Create a key (the plaintext is returned once)
//! - GET /api/v1/api-keys - Paginated, sorted, filtered listing
//! - GET /api/v1/api-keys/{id} - Single key
//! - PATCH /api/v1/api-keys/{id} - Partial update
//! - DELETE /api/v1/api-keys/{id} - Hard delete

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    app::AppState,
    error::AppError,
    models::api_key::{
        ApiKeyResponse, CreateApiKeyRequest, CreatedApiKeyResponse, KeyListParams,
        ListApiKeysQuery, PaginatedApiKeys, UpdateApiKeyRequest,
    },
    services::CurrentUser,
};

/// Create a new API key.
///
/// # Request Body
///
/// ```json
/// { "name": "tg-gateway", "comment": "production bot", "is_active": true }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the record plus `api_key`, the plaintext secret
/// - **Error (400)**: empty name
pub async fn create_api_key(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<CreateApiKeyRequest>,
) -> Result<(StatusCode, Json<CreatedApiKeyResponse>), AppError> {
    let (key, secret) = state.keys.create(user.id, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedApiKeyResponse::new(key, secret)),
    ))
}

/// List the caller's keys.
///
/// # Query Parameters
///
/// - `page` (default 1), `size` (default 10, max 100)
/// - `sort_by`: `id`, `name`, `comment`, `is_active` or `created_at`
/// - `sort_order`: `asc` or `desc`
/// - `name`, `comment`: case-insensitive substring filters
/// - `is_active`: exact filter
pub async fn list_api_keys(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListApiKeysQuery>,
) -> Result<Json<PaginatedApiKeys>, AppError> {
    let params = KeyListParams::try_from(query)?;

    let page = state.keys.list(user.id, &params).await?;

    Ok(Json(page))
}

pub async fn get_api_key(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<ApiKeyResponse>, AppError> {
    let key = state.keys.get(user.id, id).await?;

    Ok(Json(key.into()))
}

/// Partially update a key.
///
/// Absent fields are left alone; `"comment": null` clears the comment.
///
/// ```json
/// { "is_active": false }
/// ```
pub async fn update_api_key(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(changes): Json<UpdateApiKeyRequest>,
) -> Result<Json<ApiKeyResponse>, AppError> {
    let key = state.keys.update(user.id, id, changes).await?;

    Ok(Json(key.into()))
}

/// Delete a key for good. Any client still using it is locked out at once.
///
/// - **Success (204 No Content)**
/// - **Error (404)**: unknown id, or a key of another user
pub async fn delete_api_key(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.keys.delete(user.id, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
