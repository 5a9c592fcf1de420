//! Credential store: persistence for users and API keys.
//!
//! Services talk to the store through the [`KeyStore`] and [`UserStore`]
//! traits. [`PgStore`] is the production implementation; [`MemoryStore`]
//! backs tests and database-less local runs.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        api_key::{ApiKey, KeyListParams, NewApiKey, UpdateApiKeyRequest},
        user::User,
    },
    secret::KeyHash,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage of API key records.
///
/// Every operation but [`KeyStore::find_key_by_hash`] is scoped to the owning
/// user: a key owned by someone else behaves exactly like a missing one.
#[async_trait]
pub trait KeyStore: Send + Sync + Debug {
    /// Insert a key; the store assigns `id` and `created_at`.
    async fn create_key(&self, key: NewApiKey) -> Result<ApiKey, AppError>;

    async fn get_key(&self, id: i64, owner: i64) -> Result<Option<ApiKey>, AppError>;

    /// Lookup used during verification, regardless of owner or status.
    async fn find_key_by_hash(&self, hash: &KeyHash) -> Result<Option<ApiKey>, AppError>;

    /// One page of the owner's keys plus the number of keys matching the filter.
    async fn list_keys(
        &self,
        owner: i64,
        params: &KeyListParams,
    ) -> Result<(Vec<ApiKey>, i64), AppError>;

    /// Apply the supplied fields. `None` when the key does not exist for this owner.
    async fn update_key(
        &self,
        id: i64,
        owner: i64,
        changes: &UpdateApiKeyRequest,
    ) -> Result<Option<ApiKey>, AppError>;

    /// Hard delete. `false` when nothing was deleted.
    async fn delete_key(&self, id: i64, owner: i64) -> Result<bool, AppError>;

    /// Connectivity check for `/health`.
    async fn ping(&self) -> Result<(), AppError>;
}

/// Storage of dashboard users.
#[async_trait]
pub trait UserStore: Send + Sync + Debug {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AppError>;
}

/// Error returned when a freshly generated key hash is already taken.
pub(crate) fn duplicate_key_error() -> AppError {
    AppError::Internal("Could not create a unique API key. Please try again.".to_string())
}
