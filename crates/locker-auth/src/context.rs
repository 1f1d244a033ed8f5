//! Authenticated caller identity

use serde::{Deserialize, Serialize};

/// Application key whose callers may use the admin surface
pub const ADMIN_APP_KEY: &str = "registry";

/// Identity attached to a request after authentication.
///
/// Authorization is coarse: per calling application, not per object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Present for HMAC-authenticated (server-to-server) callers
    pub app_key: Option<String>,
    pub org_id: Option<String>,
    pub user_id: Option<String>,
}

impl AuthContext {
    /// Build a context for an HMAC-authenticated application
    pub fn for_app(app_key: &str) -> Self {
        Self {
            app_key: Some(app_key.to_string()),
            org_id: None,
            user_id: None,
        }
    }

    /// Build a context for a bearer-authenticated user
    pub fn for_user(user_id: &str, org_id: Option<String>) -> Self {
        Self {
            app_key: None,
            org_id,
            user_id: Some(user_id.to_string()),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.app_key.as_deref() == Some(ADMIN_APP_KEY)
    }
}
