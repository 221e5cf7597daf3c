//! Client-side sessions: the whole key/value map travels in a cookie as an
//! HS256-signed JWT.

use chrono::{Duration, Utc};
use cookie::Cookie;
use courseca_auth_core::SessionStore;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

pub use cookie::SameSite;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid session configuration: {0}")]
    InvalidConfig(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Per-client key/value session data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    values: BTreeMap<String, String>,
    modified: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once any write or removal has happened since loading.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

impl SessionStore for Session {
    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
        self.modified = true;
    }

    fn remove(&mut self, key: &str) -> Option<String> {
        let removed = self.values.remove(key);
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }
}

/// Reads a `SameSite` setting, ignoring case.
pub fn parse_same_site(value: &str) -> SessionResult<SameSite> {
    match value.to_ascii_lowercase().as_str() {
        "strict" => Ok(SameSite::Strict),
        "lax" => Ok(SameSite::Lax),
        "none" => Ok(SameSite::None),
        other => Err(SessionError::InvalidConfig(format!(
            "unknown SameSite value: {other}"
        ))),
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub secret_key: String,
    pub max_age: Duration,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "devsession".to_string(),
            secret_key: "change-me-in-production".to_string(),
            max_age: Duration::seconds(60),
            secure: false,
            http_only: true,
            same_site: SameSite::Lax,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    iat: i64,
    exp: i64,
    #[serde(default)]
    data: BTreeMap<String, String>,
}

pub struct SessionService {
    config: SessionConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SessionService {
    pub fn new(config: SessionConfig) -> SessionResult<Self> {
        if config.secret_key.is_empty() {
            return Err(SessionError::InvalidConfig(
                "session secret key must not be empty".to_string(),
            ));
        }
        if config.same_site == SameSite::None && !config.secure {
            return Err(SessionError::InvalidConfig(
                "SameSite=None requires a secure cookie".to_string(),
            ));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret_key.as_bytes()),
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn cookie_name(&self) -> &str {
        &self.config.cookie_name
    }

    /// Signs the session contents into a cookie value.
    pub fn encode(&self, session: &Session) -> SessionResult<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            iat: now.timestamp(),
            exp: (now + self.config.max_age).timestamp(),
            data: session.values.clone(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Verifies signature and expiry of a cookie value.
    pub fn decode(&self, token: &str) -> SessionResult<Session> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &validation)?;

        Ok(Session {
            values: token_data.claims.data,
            modified: false,
        })
    }

    /// Session for an incoming request. Anything unreadable starts empty.
    pub fn load(&self, cookie_value: Option<&str>) -> Session {
        match cookie_value {
            Some(token) => self.decode(token).unwrap_or_else(|e| {
                debug!("Discarding unreadable session cookie: {}", e);
                Session::new()
            }),
            None => Session::new(),
        }
    }

    /// Cookie carrying `session`, ready to add to the response jar.
    pub fn cookie(&self, session: &Session) -> SessionResult<Cookie<'static>> {
        let token = self.encode(session)?;

        Ok(Cookie::build((self.config.cookie_name.clone(), token))
            .path("/")
            .max_age(cookie::time::Duration::seconds(
                self.config.max_age.num_seconds(),
            ))
            .http_only(self.config.http_only)
            .secure(self.config.secure)
            .same_site(self.config.same_site)
            .build())
    }
}
