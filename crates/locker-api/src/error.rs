//! API error types
//!
//! The single place where error kinds map onto HTTP statuses. The wire
//! body is `{error, code, details?}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use thiserror::Error;

use locker_core::CoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Auth error: {0}")]
    Auth(#[from] locker_auth::AuthError),

    #[error("Database error: {0}")]
    Database(#[from] locker_db::DbError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details): (StatusCode, &str, String, Option<Value>) =
            match &self {
                ApiError::BadRequest(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION", msg.clone(), None)
                }
                ApiError::Auth(e) => {
                    let (status, code) = match e {
                        locker_auth::AuthError::InsufficientPermissions => {
                            (StatusCode::FORBIDDEN, "AUTHORIZATION")
                        }
                        _ => (StatusCode::UNAUTHORIZED, "AUTHENTICATION"),
                    };
                    (status, code, e.to_string(), None)
                }
                ApiError::Database(e) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    e.to_string(),
                    None,
                ),
                ApiError::Core(e) => match e {
                    CoreError::Validation(msg) => {
                        (StatusCode::BAD_REQUEST, "VALIDATION", msg.clone(), None)
                    }
                    CoreError::NotFound(msg) => {
                        (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), None)
                    }
                    CoreError::HashMismatch { declared, actual } => (
                        StatusCode::CONFLICT,
                        "HASH_MISMATCH",
                        e.to_string(),
                        Some(json!({ "declared": declared, "actual": actual })),
                    ),
                    CoreError::SessionAborted => {
                        (StatusCode::CONFLICT, "CONFLICT", e.to_string(), None)
                    }
                    CoreError::SessionExpired => {
                        (StatusCode::GONE, "SESSION_EXPIRED", e.to_string(), None)
                    }
                    CoreError::FileTooLarge { size_bytes, max_bytes } => (
                        StatusCode::PAYLOAD_TOO_LARGE,
                        "FILE_TOO_LARGE",
                        e.to_string(),
                        Some(json!({ "sizeBytes": size_bytes, "maxBytes": max_bytes })),
                    ),
                    CoreError::UnsupportedMime(mime) => (
                        StatusCode::UNSUPPORTED_MEDIA_TYPE,
                        "UNSUPPORTED_MIME",
                        e.to_string(),
                        Some(json!({ "mime": mime })),
                    ),
                    CoreError::ReplicaUnavailable => {
                        (StatusCode::BAD_REQUEST, "PRECONDITION", e.to_string(), None)
                    }
                    CoreError::Corruption { .. } => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "STORAGE",
                        e.to_string(),
                        None,
                    ),
                    CoreError::Storage(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "STORAGE",
                        e.to_string(),
                        None,
                    ),
                    CoreError::Ipfs(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "IPFS_ERROR",
                        e.to_string(),
                        None,
                    ),
                    CoreError::Database(_) | CoreError::Internal(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL",
                        e.to_string(),
                        None,
                    ),
                },
            };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some(details) = details {
            body["details"] = details;
        }

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(error: ApiError) -> StatusCode {
        error.into_response().status()
    }

    #[test]
    fn test_http_mapping() {
        assert_eq!(
            status_of(ApiError::Core(CoreError::Validation("x".into()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::Core(CoreError::NotFound("x".into()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ApiError::Core(CoreError::HashMismatch {
                declared: "a".into(),
                actual: "b".into()
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ApiError::Core(CoreError::SessionExpired)),
            StatusCode::GONE
        );
        assert_eq!(
            status_of(ApiError::Core(CoreError::FileTooLarge {
                size_bytes: 1,
                max_bytes: 0
            })),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status_of(ApiError::Core(CoreError::UnsupportedMime("x".into()))),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            status_of(ApiError::Core(CoreError::Corruption {
                expected: "a".into(),
                actual: "b".into()
            })),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(ApiError::Auth(locker_auth::AuthError::MissingCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ApiError::Auth(locker_auth::AuthError::InsufficientPermissions)),
            StatusCode::FORBIDDEN
        );
    }
}
