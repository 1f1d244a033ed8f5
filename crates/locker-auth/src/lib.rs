//! Evidence Locker Authentication and Authorization
//!
//! This crate provides application-key HMAC authentication, bearer-token
//! verification, and the short-lived upload tokens that bind the two
//! phases of an upload together.

pub mod context;
pub mod error;
pub mod hmac_keys;
pub mod jwt;
pub mod middleware;
pub mod token;

pub use context::{ADMIN_APP_KEY, AuthContext};
pub use error::AuthError;
pub use hmac_keys::HmacVerifier;
pub use jwt::{BearerClaims, BearerVerifier};
pub use middleware::{Authenticator, authenticate, require_admin, require_auth};
pub use token::{UploadTokenClaims, UploadTokenSigner};
