//! Anti-forgery state token and nonce.

use crate::error::{OidcError, OidcResult};
use courseca_auth_core::SessionStore;
use courseca_identity_core::ProviderId;
use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use tracing::warn;

/// Session key of the pending authorization state.
pub const STATE_KEY: &str = "state";
/// Session key of the pending nonce.
pub const NONCE_KEY: &str = "nonce";

const PROVIDER_MARKER: &str = "provider_id:";
const RANDOM_LEN: usize = 64;

fn random_token() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(RANDOM_LEN)
        .map(char::from)
        .collect()
}

/// `token:<64 random chars>.provider_id:<P>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationState(String);

impl AuthorizationState {
    pub fn generate(provider_id: ProviderId) -> Self {
        Self(format!(
            "token:{}.{}{}",
            random_token(),
            PROVIDER_MARKER,
            provider_id
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonce(String);

impl Nonce {
    pub fn generate() -> Self {
        Self(random_token())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Checks the callback `received` state against the one stored in `session`
/// and extracts the provider id it carries.
///
/// The session is not modified.
pub fn validate_state<S: SessionStore + ?Sized>(
    session: &S,
    received: &str,
) -> OidcResult<ProviderId> {
    let result = check_state(session.get(STATE_KEY), received);
    if let Err(e) = &result {
        warn!("Rejected callback state: {}", e);
    }
    result
}

fn check_state(stored: Option<&str>, received: &str) -> OidcResult<ProviderId> {
    let stored = stored
        .filter(|s| !s.is_empty())
        .ok_or_else(|| OidcError::InvalidState("state token not in session".to_string()))?;

    if received != stored {
        return Err(OidcError::InvalidState(format!("state mismatch: {received}")));
    }

    if received.matches(PROVIDER_MARKER).count() != 1 {
        return Err(OidcError::InvalidState(format!(
            "state {received} must name exactly one provider"
        )));
    }

    let suffix = received
        .rsplit_once(PROVIDER_MARKER)
        .map(|(_, suffix)| suffix.trim())
        .unwrap_or_default();

    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OidcError::InvalidState(format!(
            "invalid external provider id: {suffix:?}"
        )));
    }

    suffix
        .parse()
        .map_err(|_| OidcError::InvalidState(format!("provider id out of range: {suffix}")))
}
