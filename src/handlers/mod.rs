//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Calls into a service
//! 3. Returns HTTP response (JSON, status code)

/// API key management endpoints
pub mod api_keys;
/// Login endpoint
pub mod auth;
/// Chat endpoints for the gateway
pub mod chat;
/// Health check endpoint
pub mod health;
