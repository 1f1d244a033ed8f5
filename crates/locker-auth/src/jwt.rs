//! Bearer token verification

use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Claims carried by a user bearer token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BearerClaims {
    /// Subject (user id)
    pub sub: String,
    /// Audience the token was minted for
    pub aud: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Organization the user acts for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
}

/// Verifier for user bearer tokens
#[derive(Clone)]
pub struct BearerVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl BearerVerifier {
    /// Create a verifier bound to the process secret and audience
    pub fn new(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::default();
        validation.set_audience(&[audience]);
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Validate a bearer token and return its claims.
    /// Audience mismatch, expiry and signature failure all reject.
    pub fn verify(&self, token: &str) -> Result<BearerClaims, AuthError> {
        let data = decode::<BearerClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })?;
        Ok(data.claims)
    }
}
