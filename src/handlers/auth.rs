//! Dashboard login.

use axum::{Form, Json, extract::State};

use crate::{
    app::AppState,
    error::AppError,
    models::user::{LoginForm, TokenResponse},
};

/// Exchange email and password for a session token.
///
/// # Endpoint
///
/// `POST /api/v1/auth/token` (form-encoded, OAuth2 password flow)
///
/// ```text
/// username=admin@example.com&password=secret
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: `{"access_token": "...", "token_type": "bearer", "expires_in": 1800}`
/// - **Error (401)**: unknown email, wrong password or inactive user
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = state
        .auth
        .authenticate(form.username.trim(), &form.password)
        .await?
        .ok_or_else(|| {
            tracing::info!(email = %form.username, "Rejected login attempt");
            AppError::InvalidCredentials
        })?;

    let token = state.auth.issue_token(&user)?;

    tracing::info!(user_id = user.id, "Session token issued");

    Ok(Json(token))
}
