//! Shared application state and the HTTP router.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers, middleware,
    services::{ApiKeyService, AuthService, ChatService},
};

/// Services shared by every handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    pub keys: ApiKeyService,
    pub auth: AuthService,
    pub chat: Arc<ChatService>,
}

/// Build the backend router.
///
/// # Route groups
///
/// - Public: `/health`, `/api/v1/auth/token`
/// - Session token: `/api/v1/api-keys[/{id}]`
/// - API key: `/api/v1/chat/invoke`, `/api/v1/memory/history/{user_id}`
pub fn router(state: AppState) -> Router {
    // API key management for the dashboard
    let session_routes = Router::new()
        .route(
            "/api/v1/api-keys",
            post(handlers::api_keys::create_api_key).get(handlers::api_keys::list_api_keys),
        )
        .route(
            "/api/v1/api-keys/{id}",
            get(handlers::api_keys::get_api_key)
                .patch(handlers::api_keys::update_api_key)
                .delete(handlers::api_keys::delete_api_key),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::session_middleware,
        ));

    // Service-to-service routes used by the gateway
    let api_key_routes = Router::new()
        .route("/api/v1/chat/invoke", post(handlers::chat::invoke))
        .route(
            "/api/v1/memory/history/{user_id}",
            delete(handlers::chat::clear_history),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::api_key_middleware,
        ));

    Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/auth/token", post(handlers::auth::login))
        .merge(session_routes)
        .merge(api_key_routes)
        .layer(TraceLayer::new_for_http())
        // The dashboard is served from another origin
        .layer(CorsLayer::permissive())
        .with_state(state)
}
