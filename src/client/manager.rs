//! The admin client's entry point.

use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::{
    ClientError,
    api::KeyApi,
    cache::{CacheEntry, KeyListCache},
    optimistic::{OptimisticUpdate, UpdatePhase},
    session::{SessionContext, SessionState},
};
use crate::models::api_key::{
    ApiKeyResponse, CreateApiKeyRequest, CreatedApiKeyResponse, ListApiKeysQuery,
    PaginatedApiKeys, UpdateApiKeyRequest,
};

/// Key management for one dashboard user.
///
/// The locks guard plain data only and are never held across an `.await`;
/// every network call happens between two short critical sections.
#[derive(Debug)]
pub struct KeyManager<A> {
    api: A,
    session: Mutex<SessionContext>,
    cache: Mutex<KeyListCache>,
    /// Query of the listing on screen, refetched after every mutation.
    current: Mutex<Option<ListApiKeysQuery>>,
}

impl<A: KeyApi> KeyManager<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            session: Mutex::new(SessionContext::new()),
            cache: Mutex::new(KeyListCache::new()),
            current: Mutex::new(None),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), ClientError> {
        let token = self.api.login(email, password).await?;
        lock(&self.session).issue(token, Utc::now())
    }

    /// Forget the session and everything cached under it.
    pub fn logout(&self) {
        lock(&self.session).clear();
        lock(&self.cache).clear();
        *lock(&self.current) = None;
    }

    pub fn session_state(&self) -> SessionState {
        lock(&self.session).state(Utc::now())
    }

    /// The cached page for `query`, fresh or stale.
    pub fn cached(&self, query: &ListApiKeysQuery) -> Option<CacheEntry> {
        lock(&self.cache).get(query).cloned()
    }

    /// Fetch one page and make `query` the current listing.
    ///
    /// Fails with [`ClientError::Superseded`] when a newer fetch of the same
    /// query started while this one was in flight; its page is discarded.
    pub async fn list(&self, query: &ListApiKeysQuery) -> Result<PaginatedApiKeys, ClientError> {
        *lock(&self.current) = Some(query.clone());
        self.fetch(query).await
    }

    pub async fn create(
        &self,
        request: &CreateApiKeyRequest,
    ) -> Result<CreatedApiKeyResponse, ClientError> {
        let token = self.token()?;
        let result = self.api.create_key(&token, request).await;
        let created = self.guard(result);

        self.settle().await;

        created
    }

    /// Update a key optimistically.
    ///
    /// The proposal is visible in the cache right away. When the server
    /// answers, the cache holds either the server's record or the prior
    /// records again; either way the current listing is refetched.
    pub async fn update(
        &self,
        id: i64,
        changes: &UpdateApiKeyRequest,
    ) -> Result<ApiKeyResponse, ClientError> {
        let token = self.token()?;

        let update = OptimisticUpdate::apply(&mut lock(&self.cache), id, changes);
        tracing::debug!(key_id = id, phase = ?update.phase(), "Key update in flight");

        let result = self.api.update_key(&token, id, changes).await;
        let result = self.guard(result);

        let settled = {
            let mut cache = lock(&self.cache);
            match &result {
                Ok(record) => update.confirm(&mut cache, record),
                Err(_) => update.roll_back(&mut cache),
            }
        };
        if settled.phase == UpdatePhase::RolledBack {
            tracing::warn!(key_id = id, "Key update rolled back");
        }

        self.settle().await;

        result
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientError> {
        let token = self.token()?;
        let result = self.api.delete_key(&token, id).await;
        let deleted = self.guard(result);

        self.settle().await;

        deleted
    }

    async fn fetch(&self, query: &ListApiKeysQuery) -> Result<PaginatedApiKeys, ClientError> {
        let token = self.token()?;
        let ticket = lock(&self.cache).begin_fetch(query);

        let result = self.api.list_keys(&token, query).await;
        let page = self.guard(result)?;

        if !lock(&self.cache).complete_fetch(ticket, page.clone()) {
            tracing::debug!("Discarding superseded listing fetch");
            return Err(ClientError::Superseded);
        }

        Ok(page)
    }

    /// After a mutation: everything is stale, the current listing is reloaded.
    ///
    /// A failed reload is logged; the stale page stays readable.
    async fn settle(&self) {
        lock(&self.cache).invalidate_all();

        let current = lock(&self.current).clone();
        if let Some(query) = current {
            if let Err(e) = self.fetch(&query).await {
                tracing::warn!("Refetch after mutation failed: {}", e);
            }
        }
    }

    /// An expired session ends the same way a rejected one does.
    fn token(&self) -> Result<String, ClientError> {
        let now = Utc::now();
        let mut session = lock(&self.session);
        if session.state(now) == SessionState::Expired {
            tracing::info!("Session expired, logging out");
            session.clear();
        }
        session.token(now)
    }

    /// A 401 from the server ends the session.
    fn guard<T>(&self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        if let Err(ClientError::Unauthorized) = &result {
            tracing::info!("Session rejected by the server, logging out");
            lock(&self.session).clear();
        }
        result
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
