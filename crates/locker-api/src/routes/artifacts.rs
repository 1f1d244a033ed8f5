//! Artifact retrieval endpoints

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use locker_auth::{AuthContext, AuthError};
use locker_db::{Artifact, ScanStatus};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataResponse {
    pub artifact_id: String,
    pub sha256_hex: String,
    pub size_bytes: i64,
    pub mime: String,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid_v1: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuance_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_json: Option<serde_json::Value>,
}

impl From<Artifact> for MetadataResponse {
    fn from(a: Artifact) -> Self {
        Self {
            artifact_id: a.id,
            sha256_hex: a.digest,
            size_bytes: a.size_bytes,
            mime: a.mime,
            filename: a.filename,
            cid_v1: a.cid_v1,
            created_at: a.created_at,
            project_id: a.project_id,
            issuance_id: a.issuance_id,
            meta_json: a.meta_json.and_then(|raw| serde_json::from_str(&raw).ok()),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid_v1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_status: Option<ScanStatus>,
}

/// GET /v1/artifacts/{digest}
///
/// Redirects to a presigned download URL. Authentication is skipped
/// only when public reads are enabled.
pub async fn download(
    State(state): State<AppState>,
    Path(digest): Path<String>,
    context: Option<Extension<AuthContext>>,
) -> Result<Response, ApiError> {
    if !state.public_read && context.is_none() {
        return Err(AuthError::MissingCredentials.into());
    }

    let url = state.retrieval.download_url(&digest).await?;
    Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
}

/// GET /v1/artifacts/{digest}/meta
pub async fn metadata(
    State(state): State<AppState>,
    Path(digest): Path<String>,
) -> Result<Json<MetadataResponse>, ApiError> {
    let artifact = state.retrieval.metadata(&digest).await?;
    Ok(Json(artifact.into()))
}

/// GET /v1/artifacts/{digest}/verify
///
/// Unauthenticated existence probe answered from the catalog alone.
pub async fn verify(
    State(state): State<AppState>,
    Path(digest): Path<String>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let outcome = state.retrieval.verify(&digest).await?;

    let response = match outcome.artifact {
        Some(artifact) => VerifyResponse {
            exists: true,
            size_bytes: Some(artifact.size_bytes),
            mime: Some(artifact.mime),
            cid_v1: artifact.cid_v1,
            created_at: Some(artifact.created_at),
            scan_status: Some(artifact.scan_status),
        },
        None => VerifyResponse {
            exists: false,
            size_bytes: None,
            mime: None,
            cid_v1: None,
            created_at: None,
            scan_status: None,
        },
    };

    Ok(Json(response))
}
