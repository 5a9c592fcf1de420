//! TGB backend - main application entry point.
//!
//! REST API for dashboard login, API key management and the chat endpoint
//! the Telegram gateway forwards to.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Open the credential store (PostgreSQL with migrations, or in-memory
//!    when `DATABASE_URL` is unset)
//! 3. Create the default user if configured
//! 4. Build the HTTP router and start the server

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use tgb_microsuite::{
    app::{self, AppState},
    config::Config,
    db,
    secret::KeyHasher,
    services::{ApiKeyService, AuthService, ChatService, LlmClient},
    store::{KeyStore, MemoryStore, PgStore, UserStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let (keys, users): (Arc<dyn KeyStore>, Arc<dyn UserStore>) = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url, config.database_max_connections).await?;
            tracing::info!("Database pool created");

            db::run_migrations(&pool).await?;
            tracing::info!("Database migrations complete");

            let store = Arc::new(PgStore::new(pool));
            (store.clone() as Arc<dyn KeyStore>, store as Arc<dyn UserStore>)
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, keys and users live in memory only");
            let store = Arc::new(MemoryStore::new());
            (store.clone() as Arc<dyn KeyStore>, store as Arc<dyn UserStore>)
        }
    };

    let hasher = KeyHasher::new(config.api_key_pepper.clone());
    let token_lifetime = config
        .access_token_lifetime()
        .context("ACCESS_TOKEN_EXPIRE_MINUTES is out of range")?;
    let auth = AuthService::new(users, &config.secret_key, token_lifetime);

    if let Some((email, password)) = config.default_user() {
        if auth.ensure_user(email, password).await? {
            tracing::info!(%email, "Default user created");
        }
    }

    let llm = match &config.llm_api_url {
        Some(url) if !url.is_empty() => Some(LlmClient::new(
            url,
            config.llm_api_key.clone(),
            config.llm_model.clone(),
            Duration::from_secs(config.llm_timeout_secs),
        )?),
        _ => {
            tracing::warn!("LLM_API_URL is not set, the chat endpoint will answer 503");
            None
        }
    };

    let state = AppState {
        keys: ApiKeyService::new(keys, hasher),
        auth,
        chat: Arc::new(ChatService::new(llm, config.chat_history_limit)),
    };

    let app = app::router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
