//! Optimistic key updates.
//!
//! ```text
//! apply ──► AppliedOptimistically ──confirm───► Confirmed
//!                                 └─roll_back─► RolledBack
//! ```
//!
//! `confirm` and `roll_back` take the update by value, so an update settles
//! exactly once.

use super::cache::KeyListCache;
use crate::models::api_key::{ApiKeyResponse, ListApiKeysQuery, UpdateApiKeyRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePhase {
    /// The proposal is in the cache; the server has not answered yet.
    AppliedOptimistically,
    /// The server accepted the update and its record replaced the proposal.
    Confirmed,
    /// The server refused the update and the prior records are back.
    RolledBack,
}

/// An update whose proposal is already visible in the cache.
#[derive(Debug)]
#[must_use = "an applied update must be confirmed or rolled back"]
pub struct OptimisticUpdate {
    key_id: i64,
    /// Record of the key in each cached page before the proposal was written.
    prior: Vec<(ListApiKeysQuery, ApiKeyResponse)>,
}

/// Outcome of a settled update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settled {
    pub key_id: i64,
    pub phase: UpdatePhase,
}

impl OptimisticUpdate {
    /// Write `changes` into every cached page holding key `key_id`.
    ///
    /// Listings already in flight were read before the change and are
    /// cancelled, so none of them can overwrite the proposal.
    pub fn apply(cache: &mut KeyListCache, key_id: i64, changes: &UpdateApiKeyRequest) -> Self {
        cache.cancel_fetches();
        let prior = cache.records_for(key_id);

        for (query, record) in &prior {
            cache.put_record(query, project(record, changes));
        }

        Self { key_id, prior }
    }

    pub fn key_id(&self) -> i64 {
        self.key_id
    }

    pub fn phase(&self) -> UpdatePhase {
        UpdatePhase::AppliedOptimistically
    }

    /// Replace the proposal with the record the server returned.
    pub fn confirm(self, cache: &mut KeyListCache, server: &ApiKeyResponse) -> Settled {
        cache.put_record_everywhere(server);

        Settled {
            key_id: self.key_id,
            phase: UpdatePhase::Confirmed,
        }
    }

    /// Put every page back the way it was before [`OptimisticUpdate::apply`].
    pub fn roll_back(self, cache: &mut KeyListCache) -> Settled {
        for (query, record) in self.prior {
            cache.put_record(&query, record);
        }

        Settled {
            key_id: self.key_id,
            phase: UpdatePhase::RolledBack,
        }
    }
}

/// `record` as it will look once `changes` are applied.
fn project(record: &ApiKeyResponse, changes: &UpdateApiKeyRequest) -> ApiKeyResponse {
    let mut projected = record.clone();
    if let Some(name) = &changes.name {
        projected.name = name.trim().to_string();
    }
    if let Some(comment) = &changes.comment {
        projected.comment = comment.clone();
    }
    if let Some(is_active) = changes.is_active {
        projected.is_active = is_active;
    }
    projected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::api_key::PaginatedApiKeys;
    use chrono::Utc;

    fn record(id: i64, name: &str) -> ApiKeyResponse {
        ApiKeyResponse {
            id,
            key_hash: format!("hash-{}", id),
            name: name.to_string(),
            comment: Some("note".to_string()),
            is_active: true,
            created_at: Utc::now(),
            created_by: 1,
        }
    }

    fn cache_with(items: Vec<ApiKeyResponse>) -> (KeyListCache, ListApiKeysQuery) {
        let mut cache = KeyListCache::new();
        let query = ListApiKeysQuery::default();
        let ticket = cache.begin_fetch(&query);
        cache.complete_fetch(
            ticket,
            PaginatedApiKeys {
                total: items.len() as i64,
                items,
                page: 1,
                size: 10,
            },
        );
        (cache, query)
    }

    fn deactivate() -> UpdateApiKeyRequest {
        UpdateApiKeyRequest {
            is_active: Some(false),
            comment: Some(None),
            ..Default::default()
        }
    }

    #[test]
    fn apply_then_roll_back_restores_prior_record() {
        let original = record(1, "bot");
        let (mut cache, query) = cache_with(vec![original.clone(), record(2, "other")]);

        let update = OptimisticUpdate::apply(&mut cache, 1, &deactivate());
        assert_eq!(update.phase(), UpdatePhase::AppliedOptimistically);

        let applied = &cache.get(&query).unwrap().page.items[0];
        assert!(!applied.is_active);
        assert_eq!(applied.comment, None);

        let settled = update.roll_back(&mut cache);
        assert_eq!(settled.phase, UpdatePhase::RolledBack);
        assert_eq!(cache.get(&query).unwrap().page.items[0], original);
    }

    #[test]
    fn confirm_writes_the_server_record() {
        let (mut cache, query) = cache_with(vec![record(1, "bot")]);

        let update = OptimisticUpdate::apply(
            &mut cache,
            1,
            &UpdateApiKeyRequest {
                name: Some("  renamed ".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(cache.get(&query).unwrap().page.items[0].name, "renamed");

        let mut server = record(1, "renamed");
        server.comment = Some("server side".to_string());
        let settled = update.confirm(&mut cache, &server);

        assert_eq!(settled.phase, UpdatePhase::Confirmed);
        assert_eq!(cache.get(&query).unwrap().page.items[0], server);
    }

    #[test]
    fn uncached_key_applies_nothing() {
        let (mut cache, query) = cache_with(vec![record(1, "bot")]);
        let before = cache.get(&query).cloned();

        let update = OptimisticUpdate::apply(&mut cache, 99, &deactivate());
        assert_eq!(update.key_id(), 99);
        assert_eq!(cache.get(&query).cloned(), before);

        update.roll_back(&mut cache);
        assert_eq!(cache.get(&query).cloned(), before);
    }
}
