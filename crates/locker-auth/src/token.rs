//! Short-lived upload tokens
//!
//! Issued at upload init and carried back at complete. Signed with a
//! stable process-wide secret so they are verifiable without a catalog
//! lookup; lifetime equals the session's.

use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Claims carried by an upload token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UploadTokenClaims {
    /// Upload session id the token is bound to
    pub sub: String,
    /// Always "upload"
    #[serde(rename = "type")]
    pub token_type: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Signer and verifier for upload tokens
#[derive(Clone)]
pub struct UploadTokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl UploadTokenSigner {
    /// Create a signer from the process-wide secret
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a token bound to an upload session
    pub fn issue(&self, upload_id: &str, expires_at: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = UploadTokenClaims {
            sub: upload_id.to_string(),
            token_type: "upload".to_string(),
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| AuthError::InvalidToken)
    }

    /// Verify a token's signature and its binding to the given upload
    /// session. Expiry is not checked here: the session state machine
    /// owns it, and an expired token must still identify its session so
    /// a late complete can report the session as expired.
    pub fn verify(&self, token: &str, upload_id: &str) -> Result<UploadTokenClaims, AuthError> {
        let mut validation = Validation::default();
        validation.validate_exp = false;
        let data = decode::<UploadTokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|_| AuthError::InvalidToken)?;

        if data.claims.token_type != "upload" || data.claims.sub != upload_id {
            return Err(AuthError::InvalidToken);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let signer = UploadTokenSigner::new("process-secret");
        let token = signer.issue("upload-1", Utc::now() + Duration::minutes(5)).unwrap();
        let claims = signer.verify(&token, "upload-1").unwrap();
        assert_eq!(claims.token_type, "upload");
        assert_eq!(claims.sub, "upload-1");
    }

    #[test]
    fn test_token_bound_to_upload_id() {
        let signer = UploadTokenSigner::new("process-secret");
        let token = signer.issue("upload-1", Utc::now() + Duration::minutes(5)).unwrap();
        assert!(signer.verify(&token, "upload-2").is_err());
    }

    #[test]
    fn test_expired_token_still_identifies_session() {
        // Session expiry is reported by the state machine, so the token
        // must keep binding past its own exp.
        let signer = UploadTokenSigner::new("process-secret");
        let token = signer.issue("upload-1", Utc::now() - Duration::minutes(10)).unwrap();
        let claims = signer.verify(&token, "upload-1").unwrap();
        assert_eq!(claims.sub, "upload-1");
    }

    #[test]
    fn test_different_secret_rejected() {
        let signer = UploadTokenSigner::new("process-secret");
        let other = UploadTokenSigner::new("another-secret");
        let token = signer.issue("upload-1", Utc::now() + Duration::minutes(5)).unwrap();
        assert!(other.verify(&token, "upload-1").is_err());
    }
}
