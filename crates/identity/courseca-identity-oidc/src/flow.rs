//! Authorization-code flow controller.

use crate::client::OidcClient;
use crate::config::OidcConfig;
use crate::error::{OidcError, OidcResult};
use crate::state::{AuthorizationState, NONCE_KEY, Nonce, STATE_KEY, validate_state};
use crate::types::{CallbackParams, IdTokenClaims, JwkSet};
use crate::verifier::TokenVerifier;
use courseca_auth_core::{SessionStore, login};
use courseca_identity_core::{
    DecodedIdentity, ExternalLoginLink, ExternalProvider, IdentityError, ProviderId,
    ProviderKind, ProviderRegistry, UserDirectory, UserId,
};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Session key carrying the email handed to registration.
pub const EMAIL_ADDR_KEY: &str = "email_addr";
/// Session key carrying the name handed to registration.
pub const NAME_KEY: &str = "name";

const MAX_SUBJECT_LEN: usize = 255;

// Unreserved characters stay as they are; everything else, space included,
// becomes `%XX`.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Where a verified identity leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// A local account owns the email; the session is now authenticated.
    Authenticated { user_id: UserId },
    /// No local account; the session carries the registration hand-off.
    RegistrationRequired { email: String },
}

pub struct OidcFlow {
    config: OidcConfig,
    client: OidcClient,
    verifier: TokenVerifier,
    providers: Arc<dyn ProviderRegistry>,
    users: Arc<dyn UserDirectory>,
}

impl OidcFlow {
    pub fn new(
        config: OidcConfig,
        providers: Arc<dyn ProviderRegistry>,
        users: Arc<dyn UserDirectory>,
    ) -> OidcResult<Self> {
        config.validate()?;
        let client = OidcClient::new(config.http_timeout_seconds)?;
        let verifier = TokenVerifier::new(config.clock_skew_seconds);

        Ok(Self {
            config,
            client,
            verifier,
            providers,
            users,
        })
    }

    pub fn config(&self) -> &OidcConfig {
        &self.config
    }

    async fn active_provider(&self, provider_id: ProviderId) -> OidcResult<ExternalProvider> {
        self.providers
            .find_active(provider_id)
            .await?
            .ok_or(OidcError::UnknownProvider(provider_id))
    }

    fn settings_for(&self, kind: ProviderKind) -> &OidcConfig {
        match kind {
            ProviderKind::Google => &self.config,
        }
    }

    /// Begins a login with `provider_id` and returns the URL to redirect the
    /// browser to. An unknown or inactive provider leaves the session as is.
    pub async fn start<S: SessionStore + ?Sized>(
        &self,
        provider_id: ProviderId,
        session: &mut S,
    ) -> OidcResult<String> {
        let provider = match self.active_provider(provider_id).await {
            Ok(provider) => provider,
            Err(e) => {
                warn!("Refusing to start external login: {}", e);
                return Err(e);
            }
        };
        let settings = self.settings_for(provider.kind);

        let state = AuthorizationState::generate(provider.id);
        let nonce = Nonce::generate();

        let mut url = Url::parse(&settings.auth_uri)?;
        let params = [
            ("response_type", "code"),
            ("client_id", settings.client_id.as_str()),
            ("redirect_uri", settings.redirect_uri.as_str()),
            ("scope", settings.scope.as_str()),
            ("state", state.as_str()),
            ("nonce", nonce.as_str()),
        ];
        let mut query: Vec<String> = url
            .query()
            .filter(|existing| !existing.is_empty())
            .map(str::to_string)
            .into_iter()
            .collect();
        query.extend(
            params
                .iter()
                .map(|(name, value)| format!("{name}={}", utf8_percent_encode(value, QUERY_VALUE))),
        );
        url.set_query(Some(&query.join("&")));

        session.set(STATE_KEY, state.into_string());
        session.set(NONCE_KEY, nonce.into_string());

        info!(provider_id = provider.id, "Starting external login");
        debug!("Authorization URL: {}", url);
        Ok(url.to_string())
    }

    /// Handles the provider callback up to a verified identity.
    ///
    /// Once the state matches, state and nonce are removed from the session
    /// so that neither can be replayed, whatever happens afterwards.
    pub async fn continue_flow<S: SessionStore + ?Sized>(
        &self,
        params: &CallbackParams,
        session: &mut S,
    ) -> OidcResult<DecodedIdentity> {
        let provider_id = validate_state(session, &params.state)?;
        session.remove(STATE_KEY);
        let expected_nonce = session.remove(NONCE_KEY);

        let result = self
            .exchange_and_verify(provider_id, params, expected_nonce.as_deref())
            .await;

        match &result {
            Ok(identity) => info!(
                provider_id = identity.provider_id,
                "ID token verified for external subject"
            ),
            Err(e) => warn!(provider_id, "External login failed: {}", e),
        }
        result
    }

    async fn exchange_and_verify(
        &self,
        provider_id: ProviderId,
        params: &CallbackParams,
        expected_nonce: Option<&str>,
    ) -> OidcResult<DecodedIdentity> {
        let provider = self.active_provider(provider_id).await?;
        let settings = self.settings_for(provider.kind);

        if params.code.is_empty() {
            return Err(OidcError::InvalidState(
                "callback carried no authorization code".to_string(),
            ));
        }

        let tokens = self.client.exchange_code(settings, &params.code).await?;
        let keys = self.client.fetch_jwks(&settings.jwks_uri).await?;

        self.validate_id_token(
            provider.id,
            settings,
            &tokens.id_token,
            &keys,
            expected_nonce,
        )
    }

    /// Verifies the ID token and applies the OIDC claim checks in order:
    /// signature, audience and expiry, then issuer, nonce and subject.
    pub fn validate_id_token(
        &self,
        provider_id: ProviderId,
        settings: &OidcConfig,
        id_token: &str,
        keys: &JwkSet,
        expected_nonce: Option<&str>,
    ) -> OidcResult<DecodedIdentity> {
        let claims: IdTokenClaims = self.verifier.verify(id_token, keys, &settings.client_id)?;

        let iss = claims.iss.unwrap_or_default();
        if !settings.issuers.iter().any(|accepted| *accepted == iss) {
            return Err(OidcError::InvalidIdentityToken(format!(
                "invalid 'iss' {iss:?} in ID token"
            )));
        }

        match (expected_nonce, claims.nonce.as_deref()) {
            (Some(expected), Some(received)) if expected == received => {}
            (_, received) => {
                return Err(OidcError::InvalidIdentityToken(format!(
                    "nonce missing or invalid: {received:?}"
                )));
            }
        }

        let sub = claims.sub.unwrap_or_default();
        if sub.is_empty() || sub.len() > MAX_SUBJECT_LEN || !sub.is_ascii() {
            return Err(OidcError::InvalidIdentityToken(format!(
                "invalid 'sub': {sub:?}"
            )));
        }

        let email = claims
            .email
            .filter(|email| !email.trim().is_empty())
            .ok_or_else(|| {
                OidcError::InvalidIdentityToken("ID token carries no email".to_string())
            })?;

        Ok(DecodedIdentity {
            provider_id,
            external_subject_id: sub,
            email,
        })
    }

    /// Logs in the account owning the identity's email, linking the external
    /// login on first use, or prepares the registration hand-off.
    pub async fn complete_login<S: SessionStore + ?Sized>(
        &self,
        identity: &DecodedIdentity,
        session: &mut S,
    ) -> OidcResult<LoginOutcome> {
        let Some(user) = self.users.find_by_email(&identity.email).await? else {
            session.set(EMAIL_ADDR_KEY, identity.email.clone());
            session.set(NAME_KEY, String::new());
            info!(
                provider_id = identity.provider_id,
                "No account for external identity, handing off to registration"
            );
            return Ok(LoginOutcome::RegistrationRequired {
                email: identity.email.clone(),
            });
        };

        self.ensure_link(user.user_id, identity).await?;
        login(session, user.user_id);

        info!(user_id = user.user_id, "Logged in through external provider");
        Ok(LoginOutcome::Authenticated {
            user_id: user.user_id,
        })
    }

    async fn ensure_link(&self, user_id: UserId, identity: &DecodedIdentity) -> OidcResult<()> {
        if let Some(link) = self
            .users
            .find_external_link(user_id, identity.provider_id)
            .await?
        {
            if link.external_subject_id == identity.external_subject_id {
                return Ok(());
            }
            return Err(OidcError::LinkConflict(format!(
                "user {user_id} is linked to another subject at provider {}",
                identity.provider_id
            )));
        }

        if let Some(owner) = self
            .users
            .find_by_external_id(identity.provider_id, &identity.external_subject_id)
            .await?
        {
            if owner.user_id != user_id {
                return Err(OidcError::LinkConflict(format!(
                    "subject {} is linked to user {}",
                    identity.external_subject_id, owner.user_id
                )));
            }
        }

        let link = ExternalLoginLink {
            user_id,
            provider_id: identity.provider_id,
            external_subject_id: identity.external_subject_id.clone(),
        };
        match self.users.add_external_login(link).await {
            Ok(()) => Ok(()),
            Err(IdentityError::DuplicateExternalLogin(reason)) => {
                Err(OidcError::LinkConflict(reason))
            }
            Err(e) => Err(e.into()),
        }
    }
}
