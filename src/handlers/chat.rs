//! Chat endpoints used by the gateway. Both require an API key.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    app::AppState,
    error::AppError,
    middleware::auth::AuthContext,
    models::chat::{ChatRequest, ChatResponse},
};

/// Answer a user's question.
///
/// # Endpoint
///
/// `POST /api/v1/chat/invoke`
///
/// ```json
/// { "user_query": "what is RAG?", "user_id": "123456789" }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: `{"answer": "...", "original_query": "what is RAG?"}`
/// - **Error (400)**: empty query
/// - **Error (502)**: the language model failed
/// - **Error (503)**: no language model configured
pub async fn invoke(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    tracing::info!(
        key_name = %caller.key_name,
        user_id = %request.user_id,
        "Chat request received"
    );

    let response = state.chat.reply(&request).await?;

    Ok(Json(response))
}

/// Forget a user's conversation history.
///
/// `DELETE /api/v1/memory/history/{user_id}` → 204, whether or not there was any.
pub async fn clear_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.chat.clear_history(&user_id);

    Ok(StatusCode::NO_CONTENT)
}
