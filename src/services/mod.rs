//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They validate input, talk to the credential store and call upstreams.

pub mod api_key_service;
pub mod auth_service;
pub mod chat_service;

pub use api_key_service::ApiKeyService;
pub use auth_service::{AuthService, CurrentUser};
pub use chat_service::{ChatService, LlmClient};
