//! Data models: database rows, request bodies and response bodies.

/// API key records and listing parameters
pub mod api_key;
/// Chat request/response bodies
pub mod chat;
/// Dashboard users and login
pub mod user;
