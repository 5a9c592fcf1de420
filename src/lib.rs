//! Credential management core of the TGB micro-suite.
//!
//! - An HTTP backend ([`app::router`]) for dashboard login, API key
//!   management and the API-key protected chat endpoint
//! - A typed admin client ([`client`]) with a listing cache and optimistic updates
//! - A Telegram gateway ([`gateway`]) that forwards chat messages to the backend

pub mod app;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod secret;
pub mod services;
pub mod store;
