//! API key service - creation, listing, updates, deletion and verification.
//!
//! # Secret Handling
//!
//! A new key is generated server-side, hashed, and only the hash reaches the
//! store. The plaintext travels back to the caller inside an
//! [`ApiKeySecret`], which can be read exactly once.

use std::sync::Arc;

use crate::{
    error::AppError,
    models::api_key::{
        ApiKey, CreateApiKeyRequest, KeyListParams, NewApiKey, PaginatedApiKeys,
        UpdateApiKeyRequest, validate_name,
    },
    secret::{ApiKeySecret, KeyHasher},
    store::KeyStore,
};

#[derive(Debug, Clone)]
pub struct ApiKeyService {
    store: Arc<dyn KeyStore>,
    hasher: KeyHasher,
}

impl ApiKeyService {
    pub fn new(store: Arc<dyn KeyStore>, hasher: KeyHasher) -> Self {
        Self { store, hasher }
    }

    /// Create a key owned by `owner`.
    ///
    /// # Process
    ///
    /// 1. Validate the name (nothing is stored if this fails)
    /// 2. Generate a random `tgb_...` secret and hash it
    /// 3. Store the record with the hash only
    /// 4. Return the record and the one-time secret
    pub async fn create(
        &self,
        owner: i64,
        request: CreateApiKeyRequest,
    ) -> Result<(ApiKey, ApiKeySecret), AppError> {
        validate_name(&request.name)?;

        let secret = ApiKeySecret::generate(&self.hasher);

        let key = self
            .store
            .create_key(NewApiKey {
                key_hash: secret.hash().as_str().to_string(),
                name: request.name.trim().to_string(),
                comment: request.comment,
                is_active: request.is_active,
                created_by: owner,
            })
            .await?;

        tracing::info!(key_id = key.id, owner, "API key created");

        Ok((key, secret))
    }

    /// One page of the owner's keys, with the total number of matches.
    pub async fn list(
        &self,
        owner: i64,
        params: &KeyListParams,
    ) -> Result<PaginatedApiKeys, AppError> {
        let (items, total) = self.store.list_keys(owner, params).await?;

        Ok(PaginatedApiKeys {
            items: items.into_iter().map(Into::into).collect(),
            total,
            page: params.page,
            size: params.size,
        })
    }

    pub async fn get(&self, owner: i64, id: i64) -> Result<ApiKey, AppError> {
        self.store
            .get_key(id, owner)
            .await?
            .ok_or(AppError::NotFound("API key"))
    }

    /// Apply a partial update. An empty update returns the key unchanged.
    pub async fn update(
        &self,
        owner: i64,
        id: i64,
        mut changes: UpdateApiKeyRequest,
    ) -> Result<ApiKey, AppError> {
        if let Some(name) = &changes.name {
            validate_name(name)?;
            changes.name = Some(name.trim().to_string());
        }

        if changes.is_empty() {
            return self.get(owner, id).await;
        }

        let key = self
            .store
            .update_key(id, owner, &changes)
            .await?
            .ok_or(AppError::NotFound("API key"))?;

        tracing::info!(key_id = key.id, is_active = key.is_active, "API key updated");

        Ok(key)
    }

    /// Hard delete.
    pub async fn delete(&self, owner: i64, id: i64) -> Result<(), AppError> {
        if !self.store.delete_key(id, owner).await? {
            return Err(AppError::NotFound("API key"));
        }

        tracing::info!(key_id = id, owner, "API key deleted");

        Ok(())
    }

    /// Resolve a raw key to its record, only if the key exists and is active.
    pub async fn verify(&self, raw_key: &str) -> Result<Option<ApiKey>, AppError> {
        let hash = self.hasher.hash(raw_key);

        let key = self
            .store
            .find_key_by_hash(&hash)
            .await?
            .filter(|k| k.is_active);

        Ok(key)
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        self.store.ping().await
    }
}
