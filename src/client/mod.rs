//! Admin client: the data layer of the dashboard.
//!
//! [`KeyManager`] wraps a [`KeyApi`] transport with a session, a cache of key
//! listings and optimistic updates:
//!
//! - listings are cached per query and marked stale when any mutation settles
//! - a listing fetch overtaken by a newer fetch of the same query is discarded
//! - updates are written into the cache before the server answers and either
//!   confirmed or rolled back afterwards
//! - a 401 from any call logs the session out

pub mod api;
pub mod cache;
pub mod manager;
pub mod optimistic;
pub mod session;

pub use api::{HttpKeyApi, KeyApi};
pub use cache::KeyListCache;
pub use manager::KeyManager;
pub use optimistic::{OptimisticUpdate, UpdatePhase};
pub use session::{SessionContext, SessionState};

/// Errors surfaced by the admin client.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    /// No valid session, or the server rejected it. The session is cleared.
    #[error("not authenticated")]
    Unauthorized,

    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success status.
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Decode(String),

    /// A newer fetch of the same listing started before this one finished.
    #[error("listing fetch superseded by a newer one")]
    Superseded,
}
