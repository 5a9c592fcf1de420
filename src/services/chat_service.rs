//! Chat service behind `POST /api/v1/chat/invoke`.
//!
//! Keeps a bounded per-user conversation history in memory and forwards the
//! conversation to an OpenAI-compatible chat completion API. Retrieval is
//! the upstream's business; nothing here knows about documents.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::chat::{ChatMessage, ChatRequest, ChatResponse, Role},
};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer the user's question \
     concisely. If you do not know the answer, say so instead of guessing.";

/// Last `limit` messages of every conversation, keyed by user id.
#[derive(Debug)]
pub struct ConversationMemory {
    limit: usize,
    conversations: Mutex<HashMap<String, VecDeque<ChatMessage>>>,
}

impl ConversationMemory {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            conversations: Mutex::new(HashMap::new()),
        }
    }

    pub fn history(&self, user_id: &str) -> Vec<ChatMessage> {
        let conversations = self.lock();
        conversations
            .get(user_id)
            .map(|messages| messages.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Append one exchange, dropping the oldest messages past the limit.
    pub fn record(&self, user_id: &str, question: &str, answer: &str) {
        let mut conversations = self.lock();
        let messages = conversations.entry(user_id.to_string()).or_default();

        messages.push_back(ChatMessage::new(Role::User, question));
        messages.push_back(ChatMessage::new(Role::Assistant, answer));
        while messages.len() > self.limit {
            messages.pop_front();
        }
    }

    /// Forget a conversation. Returns `true` if there was anything to forget.
    pub fn clear(&self, user_id: &str) -> bool {
        self.lock().remove(user_id).is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, VecDeque<ChatMessage>>> {
        // a panic while holding the lock cannot leave the map half-written
        self.conversations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl LlmClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.filter(|k| !k.is_empty()),
            model: model.into(),
        })
    }

    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AppError> {
        let mut request = self.http.post(&self.endpoint).json(&CompletionRequest {
            model: &self.model,
            messages,
        });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!("Chat completion request failed: {}", e);
            AppError::Upstream(if e.is_timeout() {
                "chat model timed out".to_string()
            } else {
                "chat model unreachable".to_string()
            })
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(%status, "Chat completion returned an error status");
            return Err(AppError::Upstream(format!("chat model returned {}", status)));
        }

        let body: CompletionResponse = response.json().await.map_err(|e| {
            tracing::error!("Chat completion response is malformed: {}", e);
            AppError::Upstream("malformed chat model response".to_string())
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::Upstream("chat model returned no answer".to_string()))
    }
}

#[derive(Debug)]
pub struct ChatService {
    llm: Option<LlmClient>,
    memory: ConversationMemory,
    system_prompt: String,
}

impl ChatService {
    /// `llm` is `None` when no model is configured; every question is then
    /// answered with 503.
    pub fn new(llm: Option<LlmClient>, history_limit: usize) -> Self {
        Self {
            llm,
            memory: ConversationMemory::new(history_limit),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Answer one question in the context of the user's recent history.
    ///
    /// The exchange is only remembered when the model answered.
    pub async fn reply(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        let question = request.user_query.trim();
        if question.is_empty() {
            return Err(AppError::validation("user_query", "Query cannot be empty"));
        }

        let llm = self
            .llm
            .as_ref()
            .ok_or_else(|| AppError::ServiceUnavailable("AI model is not available".to_string()))?;

        let mut messages = vec![ChatMessage::new(Role::System, self.system_prompt.as_str())];
        messages.extend(self.memory.history(&request.user_id));
        messages.push(ChatMessage::new(Role::User, question));

        let answer = llm.complete(&messages).await?;
        self.memory.record(&request.user_id, question, &answer);

        tracing::debug!(user_id = %request.user_id, "Chat question answered");

        Ok(ChatResponse {
            answer,
            original_query: request.user_query.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.llm.is_some()
    }

    pub fn clear_history(&self, user_id: &str) {
        if self.memory.clear(user_id) {
            tracing::info!(%user_id, "Conversation history cleared");
        }
    }

    pub fn history(&self, user_id: &str) -> Vec<ChatMessage> {
        self.memory.history(user_id)
    }
}
