//! Signature, audience and expiry checks for ID tokens.

use crate::error::{OidcError, OidcResult};
use crate::types::{Jwk, JwkSet};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::de::DeserializeOwned;
use std::str::FromStr;

fn invalid(reason: impl Into<String>) -> OidcError {
    OidcError::InvalidIdentityToken(reason.into())
}

impl JwkSet {
    /// Key matching `kid`. A token without `kid` is accepted only when the
    /// set holds a single key.
    pub fn find_key(&self, kid: Option<&str>) -> OidcResult<&Jwk> {
        match kid {
            Some(kid) => self
                .keys
                .iter()
                .find(|k| k.kid.as_deref() == Some(kid))
                .ok_or_else(|| invalid(format!("no signing key with kid {kid}"))),
            None => match self.keys.as_slice() {
                [only] => Ok(only),
                _ => Err(invalid("token has no kid and the key set is ambiguous")),
            },
        }
    }
}

impl Jwk {
    /// Decoding key for `alg`, which must agree with this key's type and
    /// declared algorithm.
    pub fn decoding_key(&self, alg: Algorithm) -> OidcResult<DecodingKey> {
        if let Some(declared) = &self.alg {
            let declared = Algorithm::from_str(declared)
                .map_err(|_| invalid(format!("key declares unknown algorithm {declared}")))?;
            if declared != alg {
                return Err(invalid(format!(
                    "token algorithm {alg:?} does not match key algorithm {declared:?}"
                )));
            }
        }

        let key = match (self.kty.as_str(), alg) {
            (
                "RSA",
                Algorithm::RS256
                | Algorithm::RS384
                | Algorithm::RS512
                | Algorithm::PS256
                | Algorithm::PS384
                | Algorithm::PS512,
            ) => {
                let (n, e) = self
                    .n
                    .as_deref()
                    .zip(self.e.as_deref())
                    .ok_or_else(|| invalid("RSA key is missing n or e"))?;
                DecodingKey::from_rsa_components(n, e)
            }
            ("EC", Algorithm::ES256 | Algorithm::ES384) => {
                let curve = if alg == Algorithm::ES256 { "P-256" } else { "P-384" };
                if self.crv.as_deref() != Some(curve) {
                    return Err(invalid(format!(
                        "algorithm {alg:?} needs curve {curve}, key has {}",
                        self.crv.as_deref().unwrap_or("none")
                    )));
                }
                let (x, y) = self
                    .x
                    .as_deref()
                    .zip(self.y.as_deref())
                    .ok_or_else(|| invalid("EC key is missing x or y"))?;
                DecodingKey::from_ec_components(x, y)
            }
            (kty, alg) => {
                return Err(invalid(format!(
                    "algorithm {alg:?} is not usable with key type {kty}"
                )));
            }
        };

        key.map_err(|e| invalid(format!("malformed signing key: {e}")))
    }
}

/// Verifies signed tokens against a provider key set.
#[derive(Debug, Clone, Default)]
pub struct TokenVerifier {
    leeway: u64,
}

impl TokenVerifier {
    pub fn new(leeway_seconds: u64) -> Self {
        Self {
            leeway: leeway_seconds,
        }
    }

    /// Checks signature (header algorithm, key selected by `kid`), that `aud`
    /// contains `audience` and that `exp` has not passed, then returns the
    /// claims. Issuer and nonce are left to the caller.
    pub fn verify<T: DeserializeOwned>(
        &self,
        token: &str,
        keys: &JwkSet,
        audience: &str,
    ) -> OidcResult<T> {
        let header =
            decode_header(token).map_err(|e| invalid(format!("unreadable header: {e}")))?;
        let key = keys
            .find_key(header.kid.as_deref())?
            .decoding_key(header.alg)?;

        let mut validation = Validation::new(header.alg);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "aud"]);
        validation.leeway = self.leeway;

        let data = decode::<T>(token, &key, &validation).map_err(|e| invalid(e.to_string()))?;
        Ok(data.claims)
    }
}
