//! Application configuration management.
//!
//! Both binaries load their configuration from environment variables (and an
//! optional `.env` file). The `envy` crate deserializes them into type-safe
//! structs; field names map to upper-case variables (`server_port` ->
//! `SERVER_PORT`).

use std::fmt;

use serde::Deserialize;

const REDACTED: &str = "[REDACTED]";

/// Backend configuration.
///
/// # Environment Variables
///
/// - `SECRET_KEY` (required): HS256 signing key for dashboard session tokens
/// - `DATABASE_URL` (optional): PostgreSQL connection string; without it the
///   backend runs on the in-memory store
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `ACCESS_TOKEN_EXPIRE_MINUTES` (optional): session lifetime, defaults to 30
/// - `DEFAULT_USER_EMAIL` / `DEFAULT_USER_PASSWORD` (optional): user created at
///   startup when missing
/// - `API_KEY_PEPPER` (optional): switches key hashing to HMAC-SHA256
/// - `LLM_API_URL` (optional): base URL of an OpenAI-compatible API; without it
///   the chat endpoint answers 503
/// - `LLM_API_KEY`, `LLM_MODEL`, `LLM_TIMEOUT_SECS` (optional)
/// - `CHAT_HISTORY_LIMIT` (optional): messages kept per conversation, defaults to 10
#[derive(Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_port")]
    pub server_port: u16,

    pub secret_key: String,

    #[serde(default = "default_token_minutes")]
    pub access_token_expire_minutes: i64,

    #[serde(default)]
    pub default_user_email: Option<String>,

    #[serde(default)]
    pub default_user_password: Option<String>,

    #[serde(default)]
    pub api_key_pepper: Option<String>,

    #[serde(default)]
    pub llm_api_url: Option<String>,

    #[serde(default)]
    pub llm_api_key: Option<String>,

    #[serde(default = "default_llm_model")]
    pub llm_model: String,

    #[serde(default = "default_llm_timeout")]
    pub llm_timeout_secs: u64,

    #[serde(default = "default_history_limit")]
    pub chat_history_limit: usize,
}

fn default_max_connections() -> u32 {
    5
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_token_minutes() -> i64 {
    30
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_history_limit() -> usize {
    10
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., SECRET_KEY)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        envy::from_env::<Config>()
    }

    /// Default user credentials, when both halves are configured.
    pub fn default_user(&self) -> Option<(&str, &str)> {
        match (&self.default_user_email, &self.default_user_password) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some((email.as_str(), password.as_str()))
            }
            _ => None,
        }
    }

    /// Session token lifetime, or `None` when the configured minutes do not
    /// fit a duration.
    pub fn access_token_lifetime(&self) -> Option<chrono::Duration> {
        chrono::Duration::try_minutes(self.access_token_expire_minutes)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url.as_ref().map(|_| REDACTED))
            .field("database_max_connections", &self.database_max_connections)
            .field("server_port", &self.server_port)
            .field("secret_key", &REDACTED)
            .field("access_token_expire_minutes", &self.access_token_expire_minutes)
            .field("default_user_email", &self.default_user_email)
            .field(
                "default_user_password",
                &self.default_user_password.as_ref().map(|_| REDACTED),
            )
            .field("api_key_pepper", &self.api_key_pepper.as_ref().map(|_| REDACTED))
            .field("llm_api_url", &self.llm_api_url)
            .field("llm_api_key", &self.llm_api_key.as_ref().map(|_| REDACTED))
            .field("llm_model", &self.llm_model)
            .field("llm_timeout_secs", &self.llm_timeout_secs)
            .field("chat_history_limit", &self.chat_history_limit)
            .finish()
    }
}

/// Gateway configuration.
///
/// # Environment Variables
///
/// - `BOT_TOKEN` (required): Telegram bot token from @BotFather
/// - `INTERNAL_SERVICE_API_KEY` (required): backend API key (`tgb_...`)
/// - `RAG_API_BASE_URL` (optional): backend base URL, defaults to `http://localhost:3000`
/// - `RAG_API_TIMEOUT_SECS` (optional): per-request timeout, defaults to 30
/// - `TELEGRAM_API_URL` (optional): defaults to `https://api.telegram.org`
/// - `POLL_TIMEOUT_SECS` (optional): long-poll timeout, defaults to 30
#[derive(Clone, Deserialize)]
pub struct GatewayConfig {
    pub bot_token: String,

    pub internal_service_api_key: String,

    #[serde(default = "default_rag_api_base_url")]
    pub rag_api_base_url: String,

    #[serde(default = "default_rag_api_timeout")]
    pub rag_api_timeout_secs: u64,

    #[serde(default = "default_telegram_api_url")]
    pub telegram_api_url: String,

    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

fn default_rag_api_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_rag_api_timeout() -> u64 {
    30
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u64 {
    30
}

impl GatewayConfig {
    /// Load gateway configuration the same way as [`Config::from_env`].
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        envy::from_env::<GatewayConfig>()
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("bot_token", &REDACTED)
            .field("internal_service_api_key", &REDACTED)
            .field("rag_api_base_url", &self.rag_api_base_url)
            .field("rag_api_timeout_secs", &self.rag_api_timeout_secs)
            .field("telegram_api_url", &self.telegram_api_url)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish()
    }
}
