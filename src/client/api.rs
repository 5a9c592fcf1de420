//! Transport for the admin client.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use url::Url;

use super::ClientError;
use crate::models::{
    api_key::{
        ApiKeyResponse, CreateApiKeyRequest, CreatedApiKeyResponse, ListApiKeysQuery,
        PaginatedApiKeys, UpdateApiKeyRequest,
    },
    user::TokenResponse,
};

/// The backend operations the dashboard needs.
///
/// `token` is the session's bearer token.
#[async_trait]
pub trait KeyApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, ClientError>;

    async fn list_keys(
        &self,
        token: &str,
        query: &ListApiKeysQuery,
    ) -> Result<PaginatedApiKeys, ClientError>;

    async fn create_key(
        &self,
        token: &str,
        request: &CreateApiKeyRequest,
    ) -> Result<CreatedApiKeyResponse, ClientError>;

    async fn update_key(
        &self,
        token: &str,
        id: i64,
        changes: &UpdateApiKeyRequest,
    ) -> Result<ApiKeyResponse, ClientError>;

    async fn delete_key(&self, token: &str, id: i64) -> Result<(), ClientError>;
}

#[async_trait]
impl<T: KeyApi + ?Sized> KeyApi for Arc<T> {
    async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, ClientError> {
        (**self).login(email, password).await
    }

    async fn list_keys(
        &self,
        token: &str,
        query: &ListApiKeysQuery,
    ) -> Result<PaginatedApiKeys, ClientError> {
        (**self).list_keys(token, query).await
    }

    async fn create_key(
        &self,
        token: &str,
        request: &CreateApiKeyRequest,
    ) -> Result<CreatedApiKeyResponse, ClientError> {
        (**self).create_key(token, request).await
    }

    async fn update_key(
        &self,
        token: &str,
        id: i64,
        changes: &UpdateApiKeyRequest,
    ) -> Result<ApiKeyResponse, ClientError> {
        (**self).update_key(token, id, changes).await
    }

    async fn delete_key(&self, token: &str, id: i64) -> Result<(), ClientError> {
        (**self).delete_key(token, id).await
    }
}

/// [`KeyApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpKeyApi {
    http: reqwest::Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
    #[serde(default)]
    field: Option<String>,
}

impl HttpKeyApi {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        // A trailing slash makes `join` append instead of replacing the last segment
        let mut base_url =
            Url::parse(base_url).map_err(|e| ClientError::Transport(format!("bad base URL: {}", e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self { http, base_url })
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Transport(format!("bad URL: {}", e)))
    }
}

#[async_trait]
impl KeyApi for HttpKeyApi {
    async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, ClientError> {
        let response = self
            .http
            .post(self.url("api/v1/auth/token")?)
            .form(&[("username", email), ("password", password)])
            .send()
            .await
            .map_err(transport)?;

        json_body(response).await
    }

    async fn list_keys(
        &self,
        token: &str,
        query: &ListApiKeysQuery,
    ) -> Result<PaginatedApiKeys, ClientError> {
        let response = self
            .http
            .get(self.url("api/v1/api-keys")?)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(transport)?;

        json_body(response).await
    }

    async fn create_key(
        &self,
        token: &str,
        request: &CreateApiKeyRequest,
    ) -> Result<CreatedApiKeyResponse, ClientError> {
        let response = self
            .http
            .post(self.url("api/v1/api-keys")?)
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .map_err(transport)?;

        json_body(response).await
    }

    async fn update_key(
        &self,
        token: &str,
        id: i64,
        changes: &UpdateApiKeyRequest,
    ) -> Result<ApiKeyResponse, ClientError> {
        let response = self
            .http
            .patch(self.url(&format!("api/v1/api-keys/{}", id))?)
            .bearer_auth(token)
            .json(changes)
            .send()
            .await
            .map_err(transport)?;

        json_body(response).await
    }

    async fn delete_key(&self, token: &str, id: i64) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("api/v1/api-keys/{}", id))?)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        check_status(response).await.map(|_| ())
    }
}

fn transport(e: reqwest::Error) -> ClientError {
    ClientError::Transport(e.to_string())
}

async fn json_body<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    check_status(response)
        .await?
        .json()
        .await
        .map_err(|e| ClientError::Decode(e.to_string()))
}

/// Map a non-success response onto [`ClientError`], reading the server's
/// `{"error": {...}}` body when there is one.
async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let detail = response.json::<ErrorBody>().await.ok().map(|b| b.error);
    let message = detail
        .as_ref()
        .map(|d| d.message.clone())
        .unwrap_or_else(|| status.to_string());

    Err(match status {
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ClientError::Validation {
            field: detail.and_then(|d| d.field).unwrap_or_default(),
            message,
        },
        _ => ClientError::Server {
            status: status.as_u16(),
            message,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_keeps_its_path() {
        let api = HttpKeyApi::new("http://localhost:3000/backend").unwrap();
        assert_eq!(
            api.url("api/v1/api-keys").unwrap().as_str(),
            "http://localhost:3000/backend/api/v1/api-keys"
        );

        let api = HttpKeyApi::new("http://localhost:3000").unwrap();
        assert_eq!(
            api.url("api/v1/auth/token").unwrap().as_str(),
            "http://localhost:3000/api/v1/auth/token"
        );
    }

    #[test]
    fn bad_base_url_is_rejected() {
        assert!(matches!(
            HttpKeyApi::new("not a url"),
            Err(ClientError::Transport(_))
        ));
    }
}
