//! Chat request/response types shared by the backend and the gateway.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/v1/chat/invoke`.
///
/// ```json
/// { "user_query": "what is RAG?", "user_id": "123456789" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_query: String,
    /// Conversation owner; the gateway sends the Telegram user id
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub original_query: String,
}

/// Author of a message in a conversation (ChatML roles).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}
