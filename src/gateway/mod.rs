//! Telegram gateway.
//!
//! Long-polls the Bot API and forwards every text message to the backend's
//! chat endpoint, one update at a time. Each message is a single backend
//! call: on failure the user gets a short apology and nothing is retried.

pub mod rag_client;
pub mod telegram;

use std::time::Duration;

use reqwest::StatusCode;

pub use rag_client::RagApiClient;
pub use telegram::{TelegramApi, Update};

pub const GREETING: &str = "Hello! I'm a RAG assistant. Ask me anything about the documents I know. \
     Send /clear to start a new conversation.";

pub const HISTORY_CLEARED: &str = "Conversation history cleared.";

pub const STATUS_FAILURE: &str = "Sorry, an error occurred while processing your request.";

pub const TIMEOUT_FAILURE: &str =
    "The knowledge base took too long to answer. Please try again later.";

pub const CONNECT_FAILURE: &str = "I'm having trouble connecting to my knowledge base right now.";

/// Pause after a failed `getUpdates` before polling again.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The backend did not answer within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The backend answered with a non-success status.
    #[error("backend returned {0}")]
    Status(StatusCode),

    /// No connection could be made (or the HTTP client could not be built).
    #[error("connection failed: {0}")]
    Connect(String),

    /// The backend answered 2xx with a body we cannot read.
    #[error("malformed response: {0}")]
    Decode(String),

    /// The Bot API rejected a call.
    #[error("telegram error: {0}")]
    Telegram(String),
}

impl GatewayError {
    /// The request URL is dropped from the message: Bot API URLs carry the token.
    pub(crate) fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Connect(e.without_url().to_string())
        }
    }

    /// What the Telegram user is told when forwarding fails.
    pub fn user_message(&self) -> &'static str {
        match self {
            GatewayError::Timeout => TIMEOUT_FAILURE,
            GatewayError::Connect(_) => CONNECT_FAILURE,
            GatewayError::Status(_) | GatewayError::Decode(_) | GatewayError::Telegram(_) => {
                STATUS_FAILURE
            }
        }
    }
}

/// What an incoming text asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    Start,
    Clear,
    Ask(&'a str),
}

impl<'a> Command<'a> {
    /// `/start` and `/clear` (optionally addressed as `/clear@my_bot`) are
    /// commands; any other non-blank text is a question.
    pub fn parse(text: &'a str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let first = text.split_whitespace().next().unwrap_or_default();
        let command = first.split('@').next().unwrap_or_default();
        match command {
            "/start" => Some(Command::Start),
            "/clear" => Some(Command::Clear),
            _ => Some(Command::Ask(text)),
        }
    }
}

#[derive(Debug)]
pub struct Gateway {
    telegram: TelegramApi,
    rag: RagApiClient,
    poll_timeout: Duration,
}

impl Gateway {
    pub fn new(telegram: TelegramApi, rag: RagApiClient, poll_timeout: Duration) -> Self {
        Self {
            telegram,
            rag,
            poll_timeout,
        }
    }

    /// Poll forever. Transport errors are logged and polling resumes after a pause.
    pub async fn run(&self) {
        let mut offset = None;

        tracing::info!("Gateway polling for updates");

        loop {
            let updates = match self.telegram.get_updates(offset, self.poll_timeout).await {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::error!("Failed to fetch updates: {}", e);
                    tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                    continue;
                }
            };

            for update in updates {
                // Acknowledge first so a failing update is never redelivered
                offset = Some(update.update_id + 1);
                self.handle_update(&update).await;
            }
        }
    }

    /// Reply to one update. Errors end up in the log, never in the poll loop.
    pub async fn handle_update(&self, update: &Update) {
        let Some(message) = &update.message else {
            return;
        };
        let Some(text) = message.text.as_deref() else {
            return;
        };
        let Some(command) = Command::parse(text) else {
            return;
        };

        let chat_id = message.chat.id;
        let user_id = message.from.as_ref().map_or(chat_id, |u| u.id);

        if matches!(command, Command::Ask(_)) {
            if let Err(e) = self.telegram.send_typing(chat_id).await {
                tracing::debug!("Failed to send typing action: {}", e);
            }
        }

        let reply = self.reply_to(command, user_id).await;

        if let Err(e) = self.telegram.send_message(chat_id, &reply).await {
            tracing::error!(chat_id, "Failed to send reply: {}", e);
        }
    }

    /// The text sent back for `command`, including failure messages.
    pub async fn reply_to(&self, command: Command<'_>, user_id: i64) -> String {
        match command {
            Command::Start => GREETING.to_string(),
            Command::Clear => match self.rag.clear_memory(user_id).await {
                Ok(()) => HISTORY_CLEARED.to_string(),
                Err(e) => {
                    tracing::warn!(user_id, "Failed to clear history: {}", e);
                    e.user_message().to_string()
                }
            },
            Command::Ask(query) => match self.rag.ask(user_id, query).await {
                Ok(answer) => answer,
                Err(e) => {
                    tracing::warn!(user_id, "Failed to forward message: {}", e);
                    e.user_message().to_string()
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_recognised() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/clear@tgb_bot"), Some(Command::Clear));
        assert_eq!(
            Command::parse("  what is RAG? "),
            Some(Command::Ask("what is RAG?"))
        );
        assert_eq!(
            Command::parse("/unknown thing"),
            Some(Command::Ask("/unknown thing"))
        );
        assert_eq!(Command::parse("   "), None);
    }

    #[test]
    fn failures_map_to_user_messages() {
        assert_eq!(GatewayError::Timeout.user_message(), TIMEOUT_FAILURE);
        assert_eq!(
            GatewayError::Status(StatusCode::BAD_GATEWAY).user_message(),
            STATUS_FAILURE
        );
        assert_eq!(
            GatewayError::Connect("refused".to_string()).user_message(),
            CONNECT_FAILURE
        );
    }
}
