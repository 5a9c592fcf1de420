//! Authentication middleware.
//!
//! Two guards share the `Authorization: Bearer <credential>` header:
//!
//! - [`session_middleware`] accepts dashboard session tokens (JWT) and
//!   injects a `CurrentUser`. It protects the API key management routes.
//! - [`api_key_middleware`] accepts API keys, hashes them and looks them up
//!   among active keys, then injects an [`AuthContext`]. It protects the
//!   service-to-service chat routes.
//!
//! Both reject with HTTP 401 and leave the request untouched otherwise.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::{app::AppState, error::AppError};

/// Authentication context attached to requests carrying a valid API key.
///
/// Route handlers can extract it with `Extension<AuthContext>`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// ID of the authenticated API key
    pub api_key_id: i64,

    /// Display name of the key, for logs
    pub key_name: String,

    /// User who created the key
    pub owner: i64,
}

/// Dashboard session guard.
///
/// # Flow
///
/// 1. Extract the bearer token
/// 2. Check signature and expiry, resolve the subject to an active user
/// 3. Inject `CurrentUser` into the request and call the next handler
///
/// Expired tokens are reported as `token_expired` so the dashboard can tell
/// a timed-out session from a forged one.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request).ok_or(AppError::InvalidToken)?;

    let user = state.auth.validate_token(token).await?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// API key guard.
///
/// # Flow
///
/// 1. Extract the bearer credential
/// 2. Hash it and look up an active key with that hash
/// 3. Inject `AuthContext` into the request and call the next handler
///
/// Unknown and inactive keys are indistinguishable to the caller.
pub async fn api_key_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let raw_key = bearer_token(&request).ok_or(AppError::InvalidApiKey)?;

    let key = state
        .keys
        .verify(raw_key)
        .await?
        .ok_or(AppError::InvalidApiKey)?;

    tracing::debug!(key_id = key.id, key_name = %key.name, "API key accepted");

    request.extensions_mut().insert(AuthContext {
        api_key_id: key.id,
        key_name: key.name,
        owner: key.created_by,
    });

    Ok(next.run(request).await)
}

/// The credential of an `Authorization: Bearer <credential>` header.
///
/// The scheme is matched case-insensitively; an empty credential counts as missing.
fn bearer_token(request: &Request) -> Option<&str> {
    let value = request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?;

    let (scheme, credential) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let credential = credential.trim();
    (!credential.is_empty()).then_some(credential)
}
