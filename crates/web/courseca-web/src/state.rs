use anyhow::{Context, Result};
use courseca_identity_core::{ProviderRegistry, UserDirectory};
use courseca_identity_oidc::{OidcConfig, OidcFlow};
use courseca_identity_session::{SessionConfig, SessionService};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionService>,
    pub flow: Arc<OidcFlow>,
    pub users: Arc<dyn UserDirectory>,
    pub providers: Arc<dyn ProviderRegistry>,
}

impl AppState {
    pub fn new(
        session_config: SessionConfig,
        oidc_config: OidcConfig,
        providers: Arc<dyn ProviderRegistry>,
        users: Arc<dyn UserDirectory>,
    ) -> Result<Self> {
        let sessions =
            SessionService::new(session_config).context("Failed to create session service")?;
        let flow = OidcFlow::new(oidc_config, providers.clone(), users.clone())
            .context("Failed to create OIDC flow")?;

        Ok(Self {
            sessions: Arc::new(sessions),
            flow: Arc::new(flow),
            users,
            providers,
        })
    }
}
