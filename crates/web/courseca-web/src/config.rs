//! Configuration for the courseca server
//!
//! Sources, lowest precedence first:
//! - built-in defaults, chosen by `level` (dev or prod)
//! - configuration file (`courseca.toml`, or `COURSECA_CONFIG_FILE`)
//! - environment variables with the `COURSECA__` prefix
//! - legacy flat variables such as `GOOGLE_CLIENT_ID` and `PORT`

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use courseca_identity_oidc::OidcConfig;
use courseca_identity_session::{SameSite, SessionConfig, parse_same_site};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use tracing::{debug, info, warn};

/// Session secret used when none is configured. Refused in prod.
pub const DEV_SESSION_SECRET: &str = "dev-secret-key-change-in-production";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Dev,
    Prod,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub level: Level,
    pub server: ServerConfig,
    pub session: SessionSettings,
    pub google: OidcConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to (default: 127.0.0.1)
    pub host: IpAddr,

    /// Port to bind to (default: 8000)
    pub port: u16,
}

/// Session cookie settings. Unset values fall back to the level defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub cookie_name: Option<String>,
    pub secret_key: String,
    pub max_age_seconds: Option<i64>,
    pub secure: Option<bool>,
    pub http_only: bool,
    pub same_site: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter string
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 8000,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cookie_name: None,
            secret_key: DEV_SESSION_SECRET.to_string(),
            max_age_seconds: None,
            secure: None,
            http_only: true,
            same_site: "lax".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        let config_path =
            std::env::var("COURSECA_CONFIG_FILE").unwrap_or_else(|_| "courseca.toml".to_string());

        if std::path::Path::new(&config_path).exists() {
            info!("Loading configuration from {}", config_path);
            builder = builder.add_source(File::with_name(&config_path));
        } else {
            debug!("No config file found at {}, using defaults", config_path);
        }

        // e.g. COURSECA__GOOGLE__CLIENT_ID
        builder = builder.add_source(
            Environment::with_prefix("COURSECA")
                .separator("__")
                .try_parsing(true),
        );

        let mut settings: AppConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        settings.apply_env_overrides()?;
        settings.validate()?;

        Ok(settings)
    }

    /// Parses a TOML document on top of the defaults, without consulting
    /// the environment.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let settings: AppConfig = ConfigBuilder::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        settings.validate()?;
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(level) = std::env::var("COURSECA_LEVEL") {
            info!("Using COURSECA_LEVEL environment variable");
            self.level = match level.to_lowercase().as_str() {
                "dev" => Level::Dev,
                "prod" => Level::Prod,
                other => anyhow::bail!("Invalid COURSECA_LEVEL value '{}'", other),
            };
        }

        if let Ok(client_id) = std::env::var("GOOGLE_CLIENT_ID") {
            info!("Using GOOGLE_CLIENT_ID environment variable");
            self.google.client_id = client_id;
        }

        if let Ok(client_secret) = std::env::var("GOOGLE_CLIENT_SECRET") {
            info!("Using GOOGLE_CLIENT_SECRET environment variable");
            self.google.client_secret = client_secret;
        }

        if let Ok(redirect_uri) = std::env::var("GOOGLE_REDIRECT_URI") {
            info!("Using GOOGLE_REDIRECT_URI environment variable");
            self.google.redirect_uri = redirect_uri;
        }

        if let Ok(secret_key) = std::env::var("SESSION_SECRET_KEY") {
            info!("Using SESSION_SECRET_KEY environment variable");
            self.session.secret_key = secret_key;
        }

        if let Ok(host) = std::env::var("HOST") {
            info!("Using HOST environment variable");
            self.server.host = host.parse().context("Invalid HOST value")?;
        }

        if let Ok(port) = std::env::var("PORT") {
            info!("Using PORT environment variable");
            self.server.port = port.parse().context("Invalid PORT value")?;
        }

        if let Ok(log_level) = std::env::var("RUST_LOG") {
            info!("Using RUST_LOG environment variable");
            self.logging.level = log_level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if self.session.secret_key.is_empty() {
            anyhow::bail!("Session secret key cannot be empty");
        }

        if self.level == Level::Prod && self.session.secret_key == DEV_SESSION_SECRET {
            anyhow::bail!("Session secret key must be changed from default in production");
        }

        if self.session.secret_key == DEV_SESSION_SECRET {
            warn!("Using default session secret - this is insecure for production!");
        }

        if self.session.max_age_seconds.is_some_and(|secs| secs <= 0) {
            anyhow::bail!("Session max age must be positive");
        }

        let same_site = parse_same_site(&self.session.same_site)
            .context("Invalid session same_site value")?;
        if same_site == SameSite::None && !self.cookie_secure() {
            anyhow::bail!("SameSite=None requires secure session cookies");
        }

        self.google
            .validate()
            .context("Invalid google configuration")?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        let is_filter = self.logging.level.contains('=') || self.logging.level.contains(',');
        let level_lower = self.logging.level.to_lowercase();
        if !is_filter && !valid_levels.contains(&level_lower.as_str()) {
            anyhow::bail!(
                "Invalid log level '{}'. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            );
        }

        Ok(())
    }

    fn cookie_secure(&self) -> bool {
        self.session
            .secure
            .unwrap_or(self.level == Level::Prod)
    }

    /// Session settings with the level defaults filled in.
    pub fn session_config(&self) -> Result<SessionConfig> {
        let (default_name, default_max_age) = match self.level {
            Level::Dev => ("devsession", 60),
            Level::Prod => ("prodsession", 864_000),
        };

        Ok(SessionConfig {
            cookie_name: self
                .session
                .cookie_name
                .clone()
                .unwrap_or_else(|| default_name.to_string()),
            secret_key: self.session.secret_key.clone(),
            max_age: chrono::Duration::seconds(
                self.session.max_age_seconds.unwrap_or(default_max_age),
            ),
            secure: self.cookie_secure(),
            http_only: self.session.http_only,
            same_site: parse_same_site(&self.session.same_site)
                .context("Invalid session same_site value")?,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.server.host, self.server.port))
    }

    /// Get the log filter string for tracing
    pub fn log_filter(&self) -> String {
        if self.logging.level.contains('=') || self.logging.level.contains(',') {
            self.logging.level.clone()
        } else {
            format!(
                "courseca={level},courseca_web={level},courseca_identity_oidc={level},tower_http={level},{level}",
                level = self.logging.level
            )
        }
    }
}
