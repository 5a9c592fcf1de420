//! API Key model and the request/response types of the key-management API.
//!
//! API keys authenticate other services (the chat gateway, scripts) against
//! this backend. They are stored as hashes only; see [`crate::secret`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{error::AppError, secret::ApiKeySecret};

/// Represents an API key record from the database.
///
/// # Database Table
///
/// Maps to the `api_keys` table with columns:
/// - `id`: Unique identifier (BIGSERIAL)
/// - `key_hash`: hash of the actual API key
/// - `name`: display name, never empty
/// - `comment`: optional free text
/// - `is_active`: whether the key is accepted at verification time
/// - `created_at`: when the key was created
/// - `created_by`: id of the owning user
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct ApiKey {
    pub id: i64,

    /// Hex hash of the actual API key (64 hex characters)
    ///
    /// When a request comes in with "Bearer tgb_...", we:
    /// 1. Hash the raw key
    /// 2. Look up this hash in the database
    /// 3. If found and active, authenticate the request
    pub key_hash: String,

    pub name: String,

    pub comment: Option<String>,

    /// Inactive keys are rejected during verification. This provides a way to
    /// revoke access without deleting the record.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub created_by: i64,
}

/// Fields of a key about to be inserted. `id` and `created_at` come from the store.
#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub key_hash: String,
    pub name: String,
    pub comment: Option<String>,
    pub is_active: bool,
    pub created_by: i64,
}

/// Request body for creating a new API key.
///
/// # JSON Example
///
/// ```json
/// {
///   "name": "tg-gateway",
///   "comment": "used by the telegram bot",
///   "is_active": true
/// }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateApiKeyRequest {
    pub name: String,

    #[serde(default)]
    pub comment: Option<String>,

    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Partial update. Absent fields are left untouched.
///
/// `comment` distinguishes "absent" from an explicit `null`: `{"comment": null}`
/// clears the comment, `{}` leaves it alone.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct UpdateApiKeyRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub comment: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl UpdateApiKeyRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.comment.is_none() && self.is_active.is_none()
    }

    /// Apply the supplied fields to `key`.
    pub fn apply_to(&self, key: &mut ApiKey) {
        if let Some(name) = &self.name {
            key.name = name.clone();
        }
        if let Some(comment) = &self.comment {
            key.comment = comment.clone();
        }
        if let Some(is_active) = self.is_active {
            key.is_active = is_active;
        }
    }
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Reject empty or whitespace-only names.
pub fn validate_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::validation("name", "Name must not be empty"));
    }
    Ok(())
}

/// Response body for key endpoints. Never carries the plaintext key.
///
/// ```json
/// {
///   "id": 7,
///   "key_hash": "9f86d081884c7d65...",
///   "name": "tg-gateway",
///   "comment": null,
///   "is_active": true,
///   "created_at": "2025-12-20T10:00:00Z",
///   "created_by": 1
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyResponse {
    pub id: i64,
    pub key_hash: String,
    pub name: String,
    pub comment: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: i64,
}

impl From<ApiKey> for ApiKeyResponse {
    fn from(key: ApiKey) -> Self {
        Self {
            id: key.id,
            key_hash: key.key_hash,
            name: key.name,
            comment: key.comment,
            is_active: key.is_active,
            created_at: key.created_at,
            created_by: key.created_by,
        }
    }
}

/// Response to `POST /api/v1/api-keys`: the record plus the one-time plaintext.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedApiKeyResponse {
    #[serde(flatten)]
    pub key: ApiKeyResponse,

    /// The generated secret. This is the only time it is shown.
    pub api_key: String,
}

impl CreatedApiKeyResponse {
    /// Consumes the secret; after this the plaintext only exists in the response.
    pub fn new(key: ApiKey, secret: ApiKeySecret) -> Self {
        Self {
            key: key.into(),
            api_key: secret.into_plaintext(),
        }
    }
}

/// One page of keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedApiKeys {
    pub items: Vec<ApiKeyResponse>,
    /// Number of keys matching the filters, across all pages.
    pub total: i64,
    pub page: u32,
    pub size: u32,
}

/// Columns a listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortField {
    #[default]
    Id,
    Name,
    Comment,
    IsActive,
    CreatedAt,
}

impl SortField {
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "id" => Ok(SortField::Id),
            "name" => Ok(SortField::Name),
            "comment" => Ok(SortField::Comment),
            "is_active" => Ok(SortField::IsActive),
            "created_at" => Ok(SortField::CreatedAt),
            other => Err(AppError::validation(
                "sort_by",
                format!("Cannot sort by '{}'", other),
            )),
        }
    }

    /// Column name; doubles as the whitelist for dynamic ORDER BY clauses.
    pub fn column(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Name => "name",
            SortField::Comment => "comment",
            SortField::IsActive => "is_active",
            SortField::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(AppError::validation(
                "sort_order",
                "Sort order must be 'asc' or 'desc'",
            )),
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Per-column filters. `name` and `comment` are case-insensitive substring
/// matches, `is_active` is exact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyFilter {
    pub name: Option<String>,
    pub comment: Option<String>,
    pub is_active: Option<bool>,
}

impl KeyFilter {
    pub fn matches(&self, key: &ApiKey) -> bool {
        if let Some(needle) = &self.name {
            if !contains_ignore_case(&key.name, needle) {
                return false;
            }
        }
        if let Some(needle) = &self.comment {
            match &key.comment {
                Some(comment) if contains_ignore_case(comment, needle) => {}
                _ => return false,
            }
        }
        if let Some(is_active) = self.is_active {
            if key.is_active != is_active {
                return false;
            }
        }
        true
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Validated listing parameters handed to the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyListParams {
    pub page: u32,
    pub size: u32,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub filter: KeyFilter,
}

impl KeyListParams {
    pub const MAX_PAGE_SIZE: u32 = 100;

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.size)
    }
}

impl Default for KeyListParams {
    fn default() -> Self {
        Self {
            page: 1,
            size: default_page_size(),
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
            filter: KeyFilter::default(),
        }
    }
}

/// Query string of `GET /api/v1/api-keys`.
///
/// The admin client also uses this as its cache key, so it is hashable and
/// serializes back to the same query string.
///
/// `?page=2&size=10&sort_by=name&sort_order=desc&name=bot&is_active=true`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct ListApiKeysQuery {
    #[serde(default = "default_page")]
    pub page: u32,

    #[serde(default = "default_page_size")]
    pub size: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    10
}

impl Default for ListApiKeysQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            size: default_page_size(),
            sort_by: None,
            sort_order: None,
            name: None,
            comment: None,
            is_active: None,
        }
    }
}

impl TryFrom<ListApiKeysQuery> for KeyListParams {
    type Error = AppError;

    fn try_from(query: ListApiKeysQuery) -> Result<Self, Self::Error> {
        if query.page < 1 {
            return Err(AppError::validation("page", "Page must be at least 1"));
        }
        if query.size < 1 || query.size > KeyListParams::MAX_PAGE_SIZE {
            return Err(AppError::validation(
                "size",
                format!(
                    "Size must be between 1 and {}",
                    KeyListParams::MAX_PAGE_SIZE
                ),
            ));
        }

        let sort_by = match query.sort_by.as_deref() {
            Some(field) if !field.is_empty() => SortField::parse(field)?,
            _ => SortField::default(),
        };
        let sort_order = match query.sort_order.as_deref() {
            Some(order) if !order.is_empty() => SortOrder::parse(order)?,
            _ => SortOrder::default(),
        };

        // Empty filter values mean "no filter"
        let filter = KeyFilter {
            name: query.name.filter(|v| !v.is_empty()),
            comment: query.comment.filter(|v| !v.is_empty()),
            is_active: query.is_active,
        };

        Ok(Self {
            page: query.page,
            size: query.size,
            sort_by,
            sort_order,
            filter,
        })
    }
}
