//! OIDC error types.

use courseca_identity_core::{IdentityError, ProviderId};
use thiserror::Error;

pub type OidcResult<T> = Result<T, OidcError>;

#[derive(Debug, Error)]
pub enum OidcError {
    #[error("Unknown external provider id {0}")]
    UnknownProvider(ProviderId),

    /// Provider id in a URL that is not a number at all.
    #[error("Unknown external provider id {0}")]
    MalformedProviderId(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Provider request failed: {0}")]
    Transport(String),

    #[error("Invalid ID token: {0}")]
    InvalidIdentityToken(String),

    #[error("External login conflict: {0}")]
    LinkConflict(String),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),
}

impl From<reqwest::Error> for OidcError {
    fn from(e: reqwest::Error) -> Self {
        OidcError::Transport(e.to_string())
    }
}

impl OidcError {
    /// HTTP status this error surfaces as.
    ///
    /// Every failure of the login flow itself is a 401. Broken configuration
    /// and storage failures are server errors.
    pub fn status_code(&self) -> u16 {
        match self {
            OidcError::Identity(_) | OidcError::Config(_) => 500,
            _ => 401,
        }
    }
}
