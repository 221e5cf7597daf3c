//! OpenID Connect external login.
//!
//! [`OidcFlow::start`] stores a fresh state and nonce in the caller's session
//! and returns the provider redirect. [`OidcFlow::continue_flow`] validates
//! the callback, exchanges the code, verifies the ID token against the
//! provider's JWKS and yields a [`DecodedIdentity`]. [`OidcFlow::complete_login`]
//! maps that identity to a local account or hands off to registration.
//!
//! [`DecodedIdentity`]: courseca_identity_core::DecodedIdentity

pub mod client;
pub mod config;
pub mod error;
pub mod flow;
pub mod state;
pub mod types;
pub mod verifier;

#[cfg(test)]
mod test_support;

pub use client::OidcClient;
pub use config::OidcConfig;
pub use error::{OidcError, OidcResult};
pub use flow::{EMAIL_ADDR_KEY, LoginOutcome, NAME_KEY, OidcFlow};
pub use state::{AuthorizationState, NONCE_KEY, Nonce, STATE_KEY, validate_state};
pub use types::{CallbackParams, ExchangeTokens, IdTokenClaims, Jwk, JwkSet};
pub use verifier::TokenVerifier;
