//! OpenID Connect client configuration.

use crate::error::{OidcError, OidcResult};
use serde::{Deserialize, Serialize};

pub const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_JWKS_URI: &str = "https://www.googleapis.com/oauth2/v3/certs";
pub const GOOGLE_ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];

/// Settings for one OIDC client registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OidcConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
    pub jwks_uri: String,
    pub redirect_uri: String,
    /// Accepted values of the `iss` claim.
    pub issuers: Vec<String>,
    pub grant_type: String,
    pub scope: String,
    pub http_timeout_seconds: u64,
    /// Leeway applied to `exp`.
    pub clock_skew_seconds: u64,
}

impl Default for OidcConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            auth_uri: GOOGLE_AUTH_URI.to_string(),
            token_uri: GOOGLE_TOKEN_URI.to_string(),
            jwks_uri: GOOGLE_JWKS_URI.to_string(),
            redirect_uri: "http://localhost:8000/extlogin/continue".to_string(),
            issuers: GOOGLE_ISSUERS.iter().map(|s| s.to_string()).collect(),
            grant_type: "authorization_code".to_string(),
            scope: "openid email".to_string(),
            http_timeout_seconds: 30,
            clock_skew_seconds: 0,
        }
    }
}

impl OidcConfig {
    /// Google endpoints with the given client registration.
    pub fn google(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            ..Self::default()
        }
    }

    pub fn with_endpoints(
        mut self,
        auth_uri: impl Into<String>,
        token_uri: impl Into<String>,
        jwks_uri: impl Into<String>,
    ) -> Self {
        self.auth_uri = auth_uri.into();
        self.token_uri = token_uri.into();
        self.jwks_uri = jwks_uri.into();
        self
    }

    pub fn with_http_timeout(mut self, seconds: u64) -> Self {
        self.http_timeout_seconds = seconds;
        self
    }

    pub fn with_clock_skew(mut self, seconds: u64) -> Self {
        self.clock_skew_seconds = seconds;
        self
    }

    pub fn validate(&self) -> OidcResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(OidcError::Config("client_id must not be empty".to_string()));
        }
        if self.client_secret.trim().is_empty() {
            return Err(OidcError::Config(
                "client_secret must not be empty".to_string(),
            ));
        }
        if self.issuers.is_empty() {
            return Err(OidcError::Config(
                "at least one accepted issuer is required".to_string(),
            ));
        }
        for uri in [&self.auth_uri, &self.token_uri, &self.jwks_uri, &self.redirect_uri] {
            url::Url::parse(uri)?;
        }
        Ok(())
    }
}
