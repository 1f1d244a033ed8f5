//! Application-key HMAC verification
//!
//! Server-to-server callers sign the raw request body with a shared
//! secret: `x-app-sig = hex(HMAC-SHA256(secret, body))`. Verification is
//! constant-time via `Mac::verify_slice`, and unknown application keys
//! verify against a process-random decoy secret so timing cannot reveal
//! whether the key exists.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;

use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Verifier over the configured application key → secret map
#[derive(Clone)]
pub struct HmacVerifier {
    secrets: HashMap<String, String>,
    decoy: String,
}

impl HmacVerifier {
    /// Create a verifier from the configured key map
    pub fn new(secrets: HashMap<String, String>) -> Self {
        Self {
            secrets,
            decoy: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Compute the signature an application would send for a body.
    /// Exposed for clients and tests.
    pub fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verify a signature over the raw request body.
    ///
    /// Unknown application keys and bad signatures fail identically.
    pub fn verify(
        &self,
        app_key: &str,
        signature_hex: &str,
        body: &[u8],
    ) -> Result<(), AuthError> {
        let (secret, known) = match self.secrets.get(app_key) {
            Some(secret) => (secret.as_str(), true),
            None => (self.decoy.as_str(), false),
        };

        let signature = hex::decode(signature_hex).map_err(|_| AuthError::InvalidSignature)?;

        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
        mac.update(body);
        let matches = mac.verify_slice(&signature).is_ok();

        if matches && known {
            Ok(())
        } else {
            Err(AuthError::InvalidSignature)
        }
    }
}
