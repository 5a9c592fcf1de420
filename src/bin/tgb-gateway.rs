//! Telegram gateway entry point.
//!
//! Forwards chat messages to the backend's chat endpoint and relays answers.

use std::time::Duration;

use secrecy::SecretString;
use tracing_subscriber::EnvFilter;

use tgb_microsuite::{
    config::GatewayConfig,
    gateway::{Gateway, RagApiClient, TelegramApi},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = GatewayConfig::from_env()?;
    tracing::info!(backend = %config.rag_api_base_url, "Gateway configuration loaded");

    let poll_timeout = Duration::from_secs(config.poll_timeout_secs);
    let telegram = TelegramApi::new(&config.telegram_api_url, &config.bot_token, poll_timeout)?;
    let rag = RagApiClient::new(
        &config.rag_api_base_url,
        SecretString::from(config.internal_service_api_key),
        Duration::from_secs(config.rag_api_timeout_secs),
    )?;

    let gateway = Gateway::new(telegram, rag, poll_timeout);

    tokio::select! {
        _ = gateway.run() => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }

    Ok(())
}
