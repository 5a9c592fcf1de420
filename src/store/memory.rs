//! In-process credential store.
//!
//! Used by the test suites and when the backend starts without `DATABASE_URL`.
//! Nothing survives a restart.

use std::{cmp::Ordering, collections::BTreeMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{KeyStore, UserStore, duplicate_key_error};
use crate::{
    error::AppError,
    models::{
        api_key::{ApiKey, KeyListParams, NewApiKey, SortField, SortOrder, UpdateApiKeyRequest},
        user::User,
    },
    secret::KeyHash,
};

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<i64, User>,
    keys: BTreeMap<i64, ApiKey>,
    next_user_id: i64,
    next_key_id: i64,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyStore for MemoryStore {
    async fn create_key(&self, key: NewApiKey) -> Result<ApiKey, AppError> {
        let mut state = self.state.write().await;

        if state.keys.values().any(|k| k.key_hash == key.key_hash) {
            return Err(duplicate_key_error());
        }

        state.next_key_id += 1;
        let created = ApiKey {
            id: state.next_key_id,
            key_hash: key.key_hash,
            name: key.name,
            comment: key.comment,
            is_active: key.is_active,
            created_at: Utc::now(),
            created_by: key.created_by,
        };
        state.keys.insert(created.id, created.clone());

        Ok(created)
    }

    async fn get_key(&self, id: i64, owner: i64) -> Result<Option<ApiKey>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .keys
            .get(&id)
            .filter(|k| k.created_by == owner)
            .cloned())
    }

    async fn find_key_by_hash(&self, hash: &KeyHash) -> Result<Option<ApiKey>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .keys
            .values()
            .find(|k| k.key_hash == hash.as_str())
            .cloned())
    }

    async fn list_keys(
        &self,
        owner: i64,
        params: &KeyListParams,
    ) -> Result<(Vec<ApiKey>, i64), AppError> {
        let state = self.state.read().await;

        let mut matching: Vec<&ApiKey> = state
            .keys
            .values()
            .filter(|k| k.created_by == owner && params.filter.matches(k))
            .collect();
        let total = matching.len() as i64;

        matching.sort_by(|a, b| {
            let primary = compare_by(params.sort_by, a, b);
            let primary = match params.sort_order {
                SortOrder::Asc => primary,
                SortOrder::Desc => primary.reverse(),
            };
            primary.then_with(|| a.id.cmp(&b.id))
        });

        let items = matching
            .into_iter()
            .skip(params.offset() as usize)
            .take(params.size as usize)
            .cloned()
            .collect();

        Ok((items, total))
    }

    async fn update_key(
        &self,
        id: i64,
        owner: i64,
        changes: &UpdateApiKeyRequest,
    ) -> Result<Option<ApiKey>, AppError> {
        let mut state = self.state.write().await;

        let Some(key) = state.keys.get_mut(&id).filter(|k| k.created_by == owner) else {
            return Ok(None);
        };
        changes.apply_to(key);

        Ok(Some(key.clone()))
    }

    async fn delete_key(&self, id: i64, owner: i64) -> Result<bool, AppError> {
        let mut state = self.state.write().await;

        let owned = state
            .keys
            .get(&id)
            .is_some_and(|k| k.created_by == owner);
        if owned {
            state.keys.remove(&id);
        }

        Ok(owned)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AppError> {
        let mut state = self.state.write().await;

        if state.users.values().any(|u| u.email == email) {
            return Err(AppError::validation(
                "email",
                "A user with this email already exists",
            ));
        }

        state.next_user_id += 1;
        let user = User {
            id: state.next_user_id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());

        Ok(user)
    }
}

/// Ascending comparison on one column. NULL comments sort last, as in Postgres.
fn compare_by(field: SortField, a: &ApiKey, b: &ApiKey) -> Ordering {
    match field {
        SortField::Id => a.id.cmp(&b.id),
        SortField::Name => a.name.cmp(&b.name),
        SortField::Comment => match (&a.comment, &b.comment) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortField::IsActive => a.is_active.cmp(&b.is_active),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::api_key::KeyFilter;

    fn new_key(owner: i64, name: &str, comment: Option<&str>) -> NewApiKey {
        NewApiKey {
            key_hash: format!("hash-{}-{}", owner, name),
            name: name.to_string(),
            comment: comment.map(str::to_string),
            is_active: true,
            created_by: owner,
        }
    }

    #[tokio::test]
    async fn ids_are_assigned_in_order() {
        let store = MemoryStore::new();
        let a = store.create_key(new_key(1, "a", None)).await.unwrap();
        let b = store.create_key(new_key(1, "b", None)).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));
    }

    #[tokio::test]
    async fn duplicate_hash_is_rejected() {
        let store = MemoryStore::new();
        store.create_key(new_key(1, "a", None)).await.unwrap();
        let err = store.create_key(new_key(1, "a", None)).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn other_owners_cannot_see_or_touch_keys() {
        let store = MemoryStore::new();
        let key = store.create_key(new_key(1, "a", None)).await.unwrap();

        assert!(store.get_key(key.id, 2).await.unwrap().is_none());
        let changes = UpdateApiKeyRequest {
            name: Some("stolen".to_string()),
            ..Default::default()
        };
        assert!(store.update_key(key.id, 2, &changes).await.unwrap().is_none());
        assert!(!store.delete_key(key.id, 2).await.unwrap());
        assert_eq!(store.get_key(key.id, 1).await.unwrap().unwrap().name, "a");
    }

    #[tokio::test]
    async fn comment_sort_puts_missing_comments_last_ascending() {
        let store = MemoryStore::new();
        store.create_key(new_key(1, "x", None)).await.unwrap();
        store.create_key(new_key(1, "y", Some("b"))).await.unwrap();
        store.create_key(new_key(1, "z", Some("a"))).await.unwrap();

        let params = KeyListParams {
            sort_by: SortField::Comment,
            ..Default::default()
        };
        let (items, _) = store.list_keys(1, &params).await.unwrap();
        let names: Vec<_> = items.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, ["z", "y", "x"]);

        let params = KeyListParams {
            sort_by: SortField::Comment,
            sort_order: SortOrder::Desc,
            ..Default::default()
        };
        let (items, _) = store.list_keys(1, &params).await.unwrap();
        let names: Vec<_> = items.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, ["x", "y", "z"]);
    }

    #[tokio::test]
    async fn total_counts_filtered_keys_across_pages() {
        let store = MemoryStore::new();
        for i in 0..7 {
            store
                .create_key(new_key(1, &format!("bot-{}", i), None))
                .await
                .unwrap();
        }
        store.create_key(new_key(1, "other", None)).await.unwrap();

        let params = KeyListParams {
            page: 2,
            size: 5,
            filter: KeyFilter {
                name: Some("BOT".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let (items, total) = store.list_keys(1, &params).await.unwrap();
        assert_eq!(total, 7);
        assert_eq!(items.len(), 2);
    }
}
