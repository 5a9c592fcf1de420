//! Minimal Telegram Bot API client: long polling and plain-text replies.

use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;

use super::GatewayError;

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
struct BotResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<TelegramUser>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TelegramApi {
    http: reqwest::Client,
    /// `{api_url}/bot{token}`
    base: String,
}

impl TelegramApi {
    /// `poll_timeout` is the long-poll duration; the HTTP timeout leaves room
    /// on top of it.
    pub fn new(api_url: &str, token: &str, poll_timeout: Duration) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(poll_timeout + Duration::from_secs(10))
            .build()
            .map_err(|e| GatewayError::Connect(e.to_string()))?;

        Ok(Self {
            http,
            base: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        })
    }

    /// Updates after `offset`, waiting up to `timeout` for one to arrive.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<Update>, GatewayError> {
        let mut body = json!({
            "timeout": timeout.as_secs(),
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }

        self.call("getUpdates", &body).await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), GatewayError> {
        let _: Message = self
            .call("sendMessage", &json!({ "chat_id": chat_id, "text": text }))
            .await?;
        Ok(())
    }

    /// Show "typing..." while the backend thinks.
    pub async fn send_typing(&self, chat_id: i64) -> Result<(), GatewayError> {
        let _: bool = self
            .call(
                "sendChatAction",
                &json!({ "chat_id": chat_id, "action": "typing" }),
            )
            .await?;
        Ok(())
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, GatewayError> {
        let response = self
            .http
            .post(format!("{}/{}", self.base, method))
            .json(body)
            .send()
            .await
            .map_err(GatewayError::from_transport)?;

        let envelope: BotResponse<T> = response
            .json()
            .await
            .map_err(|e| {
                GatewayError::Telegram(format!(
                    "{}: malformed response: {}",
                    method,
                    e.without_url()
                ))
            })?;

        match envelope {
            BotResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            BotResponse { description, .. } => Err(GatewayError::Telegram(format!(
                "{}: {}",
                method,
                description.unwrap_or_else(|| "request failed".to_string())
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transport_errors_do_not_reveal_the_token() {
        let api = TelegramApi::new(
            "http://127.0.0.1:1",
            "123456:SECRET_BOT_TOKEN",
            Duration::from_secs(1),
        )
        .unwrap();

        let err = api.get_updates(None, Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, GatewayError::Connect(_)));
        assert!(!err.to_string().contains("SECRET_BOT_TOKEN"));
    }

    #[test]
    fn update_without_message_parses() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 10,
            "edited_message": { "message_id": 1 }
        }))
        .unwrap();
        assert_eq!(update.update_id, 10);
        assert!(update.message.is_none());
    }

    #[test]
    fn text_message_parses() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 11,
            "message": {
                "message_id": 5,
                "date": 1700000000,
                "chat": { "id": -100, "type": "private" },
                "from": { "id": 42, "is_bot": false, "first_name": "Ada" },
                "text": "hello"
            }
        }))
        .unwrap();
        let message = update.message.unwrap();
        assert_eq!(message.chat.id, -100);
        assert_eq!(message.from.unwrap().id, 42);
        assert_eq!(message.text.as_deref(), Some("hello"));
    }
}
