//! Session capability and authentication guards shared by the login flows.
//!
//! Views never reach for an ambient, per-request session. Every step that
//! needs session data receives something implementing [`SessionStore`] and
//! the guards below return an [`AuthError`] that the router turns into a
//! status code.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Session key holding the id of the authenticated user.
pub const USER_ID_KEY: &str = "user_id";

/// Errors produced by the authentication guards.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthError {
    /// The caller must be logged in to reach this area.
    #[error("This area requires authentication.")]
    AuthenticationRequired,

    /// The caller must *not* be logged in to reach this area.
    #[error("This is a public area only.")]
    UnauthenticatedOnly,
}

/// Result type for guard checks.
pub type AuthResult<T = ()> = Result<T, AuthError>;

/// Narrow key/value capability over one client's session.
///
/// Implementations are scoped to a single client; nothing here is shared
/// between requests.
pub trait SessionStore: Send {
    /// Returns the value stored under `key`.
    fn get(&self, key: &str) -> Option<&str>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: String);

    /// Removes `key`, returning the value it held.
    fn remove(&mut self, key: &str) -> Option<String>;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Id of the user marked as authenticated in `session`, if any.
///
/// Only a plain run of ASCII digits counts as a marker.
pub fn current_user_id<S: SessionStore + ?Sized>(session: &S) -> Option<i64> {
    session
        .get(USER_ID_KEY)
        .filter(|value| !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|value| value.parse().ok())
}

/// Passes only when the session carries an authenticated user.
pub fn require_authenticated<S: SessionStore + ?Sized>(session: &S) -> AuthResult<i64> {
    current_user_id(session).ok_or(AuthError::AuthenticationRequired)
}

/// Passes only when nobody is logged in on this session.
pub fn require_unauthenticated<S: SessionStore + ?Sized>(session: &S) -> AuthResult<()> {
    match current_user_id(session) {
        Some(_) => Err(AuthError::UnauthenticatedOnly),
        None => Ok(()),
    }
}

/// Marks `user_id` as the authenticated user of this session.
pub fn login<S: SessionStore + ?Sized>(session: &mut S, user_id: i64) {
    session.set(USER_ID_KEY, user_id.to_string());
}

/// Clears the authenticated-user marker, returning the user that was logged in.
pub fn logout<S: SessionStore + ?Sized>(session: &mut S) -> Option<i64> {
    session
        .remove(USER_ID_KEY)
        .and_then(|value| value.parse().ok())
}
