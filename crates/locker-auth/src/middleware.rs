//! Authentication middleware for Axum
//!
//! HMAC verification needs the raw request body, so the middleware
//! buffers it, verifies, and reassembles the request for downstream
//! extractors. Control-plane bodies are small JSON documents.

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::context::AuthContext;
use crate::error::AuthError;
use crate::hmac_keys::HmacVerifier;
use crate::jwt::BearerVerifier;

/// Header carrying the calling application's key
pub const APP_KEY_HEADER: &str = "x-app-key";
/// Header carrying the hex HMAC-SHA256 signature of the raw body
pub const APP_SIG_HEADER: &str = "x-app-sig";

const BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Evaluates the authentication modes in order per endpoint policy
#[derive(Clone)]
pub struct Authenticator {
    hmac: HmacVerifier,
    bearer: Option<BearerVerifier>,
}

impl Authenticator {
    pub fn new(hmac: HmacVerifier, bearer: Option<BearerVerifier>) -> Self {
        Self { hmac, bearer }
    }

    fn hmac_context(&self, headers: &HeaderMap, body: &[u8]) -> Result<AuthContext, AuthError> {
        let app_key = headers
            .get(APP_KEY_HEADER)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::MissingCredentials)?;
        let signature = headers
            .get(APP_SIG_HEADER)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::MissingCredentials)?;

        self.hmac.verify(app_key, signature, body)?;
        debug!(app_key, "Authenticated application");
        Ok(AuthContext::for_app(app_key))
    }

    fn bearer_context(&self, headers: &HeaderMap) -> Result<AuthContext, AuthError> {
        let header = headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::MissingCredentials)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?;

        let verifier = self.bearer.as_ref().ok_or(AuthError::InvalidToken)?;
        let claims = verifier.verify(token)?;
        debug!(user_id = %claims.sub, "Authenticated user");
        Ok(AuthContext::for_user(&claims.sub, claims.org_id))
    }

    /// Authenticate a request from its headers and raw body.
    /// HMAC is evaluated first, then bearer.
    pub fn authenticate(&self, headers: &HeaderMap, body: &[u8]) -> Result<AuthContext, AuthError> {
        if headers.contains_key(APP_KEY_HEADER) {
            self.hmac_context(headers, body)
        } else if headers.contains_key(AUTHORIZATION) {
            self.bearer_context(headers)
        } else {
            Err(AuthError::MissingCredentials)
        }
    }
}

/// Authentication middleware
///
/// Verifies whatever credentials the request carries and attaches the
/// resulting [`AuthContext`] to request extensions. Requests without
/// credentials pass through unauthenticated; enforcement is left to
/// [`require_auth`] / [`require_admin`] per route policy.
pub async fn authenticate(
    State(auth): State<Arc<Authenticator>>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let has_credentials = request.headers().contains_key(APP_KEY_HEADER)
        || request.headers().contains_key(AUTHORIZATION);
    if !has_credentials {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, BODY_LIMIT)
        .await
        .map_err(|_| AuthError::MissingCredentials)?;

    let context = auth.authenticate(&parts.headers, &bytes)?;

    let mut request = Request::from_parts(parts, Body::from(bytes));
    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

/// Middleware to require an authenticated caller
pub async fn require_auth(request: Request, next: Next) -> Result<Response, AuthError> {
    request
        .extensions()
        .get::<AuthContext>()
        .ok_or(AuthError::MissingCredentials)?;
    Ok(next.run(request).await)
}

/// Middleware to require the admin application
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AuthError> {
    let context = request
        .extensions()
        .get::<AuthContext>()
        .ok_or(AuthError::MissingCredentials)?;

    if !context.is_admin() {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}
