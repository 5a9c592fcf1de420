//! HTTP client for the backend's chat endpoints.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use super::GatewayError;
use crate::models::chat::{ChatRequest, ChatResponse};

/// Forwards questions to `POST /api/v1/chat/invoke`, authenticated with a
/// service API key. One call per question, never retried.
#[derive(Debug)]
pub struct RagApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl RagApiClient {
    pub fn new(base_url: &str, api_key: SecretString, timeout: Duration) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Connect(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub async fn ask(&self, user_id: i64, query: &str) -> Result<String, GatewayError> {
        let request = ChatRequest {
            user_query: query.to_string(),
            user_id: user_id.to_string(),
        };

        let response = self
            .http
            .post(format!("{}/api/v1/chat/invoke", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(GatewayError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.without_url().to_string()))?;

        Ok(body.answer)
    }

    /// Ask the backend to forget this user's conversation.
    pub async fn clear_memory(&self, user_id: i64) -> Result<(), GatewayError> {
        let response = self
            .http
            .delete(format!("{}/api/v1/memory/history/{}", self.base_url, user_id))
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await
            .map_err(GatewayError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status));
        }

        Ok(())
    }
}
