//! HTTP middleware components.
//!
//! Middleware run before route handlers. They authenticate requests and
//! short-circuit the ones that fail.

/// Session token and API key authentication
pub mod auth;
