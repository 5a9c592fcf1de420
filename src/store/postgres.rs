//! PostgreSQL implementation of the credential store.

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::{KeyStore, UserStore, duplicate_key_error};
use crate::{
    db::DbPool,
    error::AppError,
    models::{
        api_key::{ApiKey, KeyFilter, KeyListParams, NewApiKey, UpdateApiKeyRequest},
        user::User,
    },
    secret::KeyHash,
};

const KEY_COLUMNS: &str = "id, key_hash, name, comment, is_active, created_at, created_by";

const USER_COLUMNS: &str = "id, email, password_hash, is_active, created_at";

/// Credential store backed by the `users` and `api_keys` tables.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyStore for PgStore {
    async fn create_key(&self, key: NewApiKey) -> Result<ApiKey, AppError> {
        let result = sqlx::query_as::<_, ApiKey>(&format!(
            r#"
            INSERT INTO api_keys (key_hash, name, comment, is_active, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {KEY_COLUMNS}
            "#
        ))
        .bind(&key.key_hash)
        .bind(&key.name)
        .bind(&key.comment)
        .bind(key.is_active)
        .bind(key.created_by)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(created) => Ok(created),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(duplicate_key_error()),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_key(&self, id: i64, owner: i64) -> Result<Option<ApiKey>, AppError> {
        let key = sqlx::query_as::<_, ApiKey>(&format!(
            "SELECT {KEY_COLUMNS} FROM api_keys WHERE id = $1 AND created_by = $2"
        ))
        .bind(id)
        // Only the owner sees the key
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        Ok(key)
    }

    async fn find_key_by_hash(&self, hash: &KeyHash) -> Result<Option<ApiKey>, AppError> {
        let key = sqlx::query_as::<_, ApiKey>(&format!(
            "SELECT {KEY_COLUMNS} FROM api_keys WHERE key_hash = $1"
        ))
        .bind(hash.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(key)
    }

    async fn list_keys(
        &self,
        owner: i64,
        params: &KeyListParams,
    ) -> Result<(Vec<ApiKey>, i64), AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM api_keys");
        push_filters(&mut count, owner, &params.filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {KEY_COLUMNS} FROM api_keys"));
        push_filters(&mut select, owner, &params.filter);
        // Column and direction come from enums, never from user text
        select
            .push(" ORDER BY ")
            .push(params.sort_by.column())
            .push(" ")
            .push(params.sort_order.keyword())
            .push(", id ASC LIMIT ")
            .push_bind(i64::from(params.size))
            .push(" OFFSET ")
            .push_bind(params.offset() as i64);

        let items = select
            .build_query_as::<ApiKey>()
            .fetch_all(&self.pool)
            .await?;

        Ok((items, total))
    }

    async fn update_key(
        &self,
        id: i64,
        owner: i64,
        changes: &UpdateApiKeyRequest,
    ) -> Result<Option<ApiKey>, AppError> {
        // $4 tells whether a comment was supplied at all, so an explicit null clears it
        let key = sqlx::query_as::<_, ApiKey>(&format!(
            r#"
            UPDATE api_keys
            SET name = COALESCE($3, name),
                comment = CASE WHEN $4 THEN $5 ELSE comment END,
                is_active = COALESCE($6, is_active)
            WHERE id = $1 AND created_by = $2
            RETURNING {KEY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner)
        .bind(changes.name.as_deref())
        .bind(changes.comment.is_some())
        .bind(changes.comment.clone().flatten())
        .bind(changes.is_active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(key)
    }

    async fn delete_key(&self, id: i64, owner: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = $1 AND created_by = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AppError> {
        let result = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::validation(
                "email",
                "A user with this email already exists",
            )),
            Err(e) => Err(e.into()),
        }
    }
}

/// Append the owner scope and the column filters as a WHERE clause.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, owner: i64, filter: &KeyFilter) {
    builder.push(" WHERE created_by = ").push_bind(owner);

    if let Some(name) = &filter.name {
        builder.push(" AND name ILIKE ").push_bind(like_pattern(name));
    }
    if let Some(comment) = &filter.comment {
        builder
            .push(" AND comment ILIKE ")
            .push_bind(like_pattern(comment));
    }
    if let Some(is_active) = filter.is_active {
        builder.push(" AND is_active = ").push_bind(is_active);
    }
}

/// `%needle%` with LIKE wildcards in the needle escaped.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("bot"), "%bot%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn filters_render_in_order() {
        let filter = KeyFilter {
            name: Some("bot".to_string()),
            comment: None,
            is_active: Some(true),
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM api_keys");
        push_filters(&mut builder, 1, &filter);
        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM api_keys WHERE created_by = $1 AND name ILIKE $2 AND is_active = $3"
        );
    }
}
