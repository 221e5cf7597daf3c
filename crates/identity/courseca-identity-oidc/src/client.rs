//! Outbound calls to the provider's token and key endpoints.

use crate::config::OidcConfig;
use crate::error::{OidcError, OidcResult};
use crate::types::{ExchangeTokens, JwkSet};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info};

#[derive(Clone)]
pub struct OidcClient {
    http_client: Client,
}

impl OidcClient {
    pub fn new(http_timeout_seconds: u64) -> OidcResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(http_timeout_seconds))
            .build()
            .map_err(|e| OidcError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { http_client })
    }

    /// Exchanges an authorization code for tokens. Failures are not retried.
    pub async fn exchange_code(
        &self,
        config: &OidcConfig,
        code: &str,
    ) -> OidcResult<ExchangeTokens> {
        let mut params = HashMap::new();
        params.insert("code", code);
        params.insert("client_id", &config.client_id);
        params.insert("redirect_uri", &config.redirect_uri);
        params.insert("client_secret", &config.client_secret);
        params.insert("grant_type", &config.grant_type);

        let response = self
            .http_client
            .post(&config.token_uri)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Token exchange failed with {}: {}", status, error_text);
            return Err(OidcError::Transport(format!(
                "token endpoint returned {status}"
            )));
        }

        let tokens: ExchangeTokens = response
            .json()
            .await
            .map_err(|e| OidcError::Transport(format!("invalid token response: {e}")))?;

        info!("Exchanged authorization code for tokens");
        Ok(tokens)
    }

    /// Fetches the provider's current signing keys.
    pub async fn fetch_jwks(&self, jwks_uri: &str) -> OidcResult<JwkSet> {
        let response = self.http_client.get(jwks_uri).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            error!("JWKS request to {} failed with {}", jwks_uri, status);
            return Err(OidcError::Transport(format!(
                "JWKS endpoint returned {status}"
            )));
        }

        let keys: JwkSet = response
            .json()
            .await
            .map_err(|e| OidcError::Transport(format!("invalid JWKS document: {e}")))?;

        debug!("Fetched {} signing keys from {}", keys.keys.len(), jwks_uri);
        Ok(keys)
    }
}
