//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Validation Errors**: malformed input, reported against a single field
/// - **Resource Errors**: requested key or user not found (or not owned by the caller)
/// - **Authentication Errors**: bad credentials, bad or expired session tokens, bad API keys
/// - **Infrastructure Errors**: database failures, unavailable or failing chat upstream
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A request field failed validation.
    ///
    /// Returns HTTP 400 Bad Request with the offending field name.
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// The named resource does not exist or belongs to another user.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Login failed: unknown email, wrong password or inactive user.
    #[error("Incorrect email or password")]
    InvalidCredentials,

    /// Bearer token missing, malformed, badly signed, or its user is gone.
    #[error("Could not validate credentials")]
    InvalidToken,

    /// Bearer token was valid but its `exp` has passed.
    #[error("Authentication token has expired")]
    TokenExpired,

    /// API key is missing, unknown, or inactive.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// A dependency the request needs is not configured.
    ///
    /// Returns HTTP 503 Service Unavailable.
    #[error("{0}")]
    ServiceUnavailable(String),

    /// The chat upstream failed or answered with garbage.
    ///
    /// Returns HTTP 502 Bad Gateway.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Anything else that is our fault (hashing, token signing, key collisions).
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for a field-level validation failure.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Whether the error means the caller is not (or no longer) authenticated.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            AppError::InvalidCredentials
                | AppError::InvalidToken
                | AppError::TokenExpired
                | AppError::InvalidApiKey
        )
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "validation_error",
///     "message": "Name must not be empty",
///     "field": "name"
///   }
/// }
/// ```
///
/// `field` is only present for validation errors. Authentication failures
/// also carry `WWW-Authenticate: Bearer`.
///
/// # Status Code Mapping
///
/// - `Validation` → 400 Bad Request
/// - `InvalidCredentials`, `InvalidToken`, `TokenExpired`, `InvalidApiKey` → 401 Unauthorized
/// - `NotFound` → 404 Not Found
/// - `Upstream` → 502 Bad Gateway
/// - `ServiceUnavailable` → 503 Service Unavailable
/// - `Database`, `Internal` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let challenge = self.is_auth_error();
        let mut field = None;
        let (status, code, message) = match self {
            AppError::Validation {
                field: f,
                ref message,
            } => {
                field = Some(f);
                (StatusCode::BAD_REQUEST, "validation_error", message.clone())
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                self.to_string(),
            ),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", self.to_string()),
            AppError::TokenExpired => (StatusCode::UNAUTHORIZED, "token_expired", self.to_string()),
            AppError::InvalidApiKey => (
                StatusCode::UNAUTHORIZED,
                "invalid_api_key",
                self.to_string(),
            ),
            AppError::ServiceUnavailable(ref msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg.clone(),
            ),
            AppError::Upstream(ref msg) => {
                tracing::warn!("Chat upstream failure: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_error",
                    "The language model did not return a usable answer".to_string(),
                )
            }
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message,
        });
        if let Some(field) = field {
            error["field"] = json!(field);
        }

        let body = Json(json!({ "error": error }));

        if challenge {
            return (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response();
        }

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let response = AppError::validation("name", "Name must not be empty").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn auth_errors_carry_bearer_challenge() {
        for err in [
            AppError::InvalidCredentials,
            AppError::InvalidToken,
            AppError::TokenExpired,
            AppError::InvalidApiKey,
        ] {
            assert!(err.is_auth_error());
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(
                response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
                "Bearer"
            );
        }
    }

    #[test]
    fn not_found_message_names_resource() {
        let err = AppError::NotFound("API key");
        assert_eq!(err.to_string(), "API key not found");
        assert!(!err.is_auth_error());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
