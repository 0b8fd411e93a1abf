//! Federated identity verification.
//! Validates an externally issued id token against a trusted issuer's public
//! key set and extracts the profile claims the resolver needs. Every failure
//! collapses into one opaque verification error so callers never learn *why*
//! a token was rejected.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// Profile claims carried by a verified federated token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedClaims {
    pub email: String,
    pub name: String,
    pub picture: String,
}

pub trait FederatedVerifier: Send + Sync {
    fn verify(&self, external_token: &str) -> AppResult<FederatedClaims>;
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    picture: String,
}

/// Verifier for Google-style RS256 id tokens.
///
/// Holds the issuer's current public key set; the set is fetched and refreshed
/// by the config/bootstrap collaborator, not here. Rotation is handled by
/// trying every cached key.
pub struct GoogleVerifier {
    issuer: String,
    audience: String,
    keys: Vec<DecodingKey>,
}

impl GoogleVerifier {
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>, keys: Vec<DecodingKey>) -> Self {
        Self { issuer: issuer.into(), audience: audience.into(), keys }
    }

    pub fn from_pem_keys(issuer: impl Into<String>, audience: impl Into<String>, pems: &[String]) -> anyhow::Result<Self> {
        let mut keys = Vec::with_capacity(pems.len());
        for pem in pems {
            keys.push(DecodingKey::from_rsa_pem(pem.as_bytes())
                .map_err(|e| anyhow::anyhow!("bad federated trust key: {}", e))?);
        }
        Ok(Self::new(issuer, audience, keys))
    }

    fn validation(&self) -> Validation {
        let mut v = Validation::new(Algorithm::RS256);
        v.set_issuer(&[self.issuer.as_str()]);
        v.set_audience(&[self.audience.as_str()]);
        v
    }
}

fn opaque() -> AppError {
    AppError::verification("Failed to authenticate you with google. Try with some other google account")
}

/// Request a larger rendition of the provider's default 96px avatar.
pub fn upgrade_picture(picture: &str) -> String {
    picture.replace("s96-c", "s384-c")
}

impl FederatedVerifier for GoogleVerifier {
    fn verify(&self, external_token: &str) -> AppResult<FederatedClaims> {
        let validation = self.validation();
        for key in &self.keys {
            if let Ok(data) = decode::<IdTokenClaims>(external_token, key, &validation) {
                let c = data.claims;
                return Ok(FederatedClaims {
                    email: c.email,
                    name: c.name,
                    picture: upgrade_picture(&c.picture),
                });
            }
        }
        // Expired, malformed, wrong issuer/audience, unknown key: all the same
        // to the caller.
        Err(opaque())
    }
}
