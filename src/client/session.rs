//! Client-side session: the bearer token and when it stops being valid.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};

use super::ClientError;
use crate::models::user::TokenResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Never logged in, logged out, or rejected by the server.
    Anonymous,
    Active,
    /// The token's lifetime has passed; a new login is needed.
    Expired,
}

#[derive(Debug)]
struct Session {
    access_token: SecretString,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct SessionContext {
    session: Option<Session>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session from a login response, issued at `now`.
    ///
    /// A lifetime that does not fit a timestamp is a malformed response and
    /// leaves the context as it was.
    pub fn issue(&mut self, token: TokenResponse, now: DateTime<Utc>) -> Result<(), ClientError> {
        let expires_at = Duration::try_seconds(token.expires_in)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                ClientError::Decode(format!("expires_in out of range: {}", token.expires_in))
            })?;

        self.session = Some(Session {
            access_token: SecretString::from(token.access_token),
            expires_at,
        });
        Ok(())
    }

    pub fn state(&self, now: DateTime<Utc>) -> SessionState {
        match &self.session {
            None => SessionState::Anonymous,
            Some(session) if session.expires_at <= now => SessionState::Expired,
            Some(_) => SessionState::Active,
        }
    }

    /// The bearer token to send, if the session is still active at `now`.
    pub fn token(&self, now: DateTime<Utc>) -> Result<String, ClientError> {
        match &self.session {
            Some(session) if session.expires_at > now => {
                Ok(session.access_token.expose_secret().to_string())
            }
            _ => Err(ClientError::Unauthorized),
        }
    }

    /// Drop the token (logout, or the server said 401).
    pub fn clear(&mut self) {
        self.session = None;
    }
}
