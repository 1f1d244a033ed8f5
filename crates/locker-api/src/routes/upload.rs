//! Two-phase upload endpoints

use axum::{Extension, Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use locker_auth::{AuthContext, AuthError};
use locker_core::{ArtifactDescriptor, InitRequest};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitBody {
    pub filename: String,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub mime_hint: Option<String>,
    #[serde(default, alias = "declaredDigest")]
    pub declared_sha256: Option<String>,
    #[serde(default)]
    pub uploader_org_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub issuance_id: Option<String>,
    #[serde(default)]
    pub meta_json: Option<serde_json::Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitResponseBody {
    pub upload_id: String,
    pub token: String,
    pub put_url: String,
    pub bucket_key: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteBody {
    pub upload_id: String,
    pub token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteResponseBody {
    pub artifact_id: String,
    pub sha256_hex: String,
    pub size_bytes: i64,
    pub mime: String,
    pub bucket_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid_v1: Option<String>,
    pub download_url: String,
}

impl From<ArtifactDescriptor> for CompleteResponseBody {
    fn from(d: ArtifactDescriptor) -> Self {
        Self {
            artifact_id: d.artifact_id,
            sha256_hex: d.sha256_hex,
            size_bytes: d.size_bytes,
            mime: d.mime,
            bucket_key: d.bucket_key,
            cid_v1: d.cid_v1,
            download_url: d.download_url,
        }
    }
}

/// Upload endpoints are server-to-server only
fn require_app(context: &AuthContext) -> Result<(), ApiError> {
    if context.app_key.is_none() {
        return Err(AuthError::MissingCredentials.into());
    }
    Ok(())
}

/// POST /v1/upload/init
pub async fn init(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Json(body): Json<InitBody>,
) -> Result<(StatusCode, Json<InitResponseBody>), ApiError> {
    require_app(&context)?;
    debug!(filename = %body.filename, "Upload init requested");

    let response = state
        .ingest
        .init(InitRequest {
            filename: body.filename,
            size_bytes: body.size_bytes,
            mime_hint: body.mime_hint,
            declared_digest: body.declared_sha256,
            uploader_org_id: body.uploader_org_id.or(context.org_id),
            project_id: body.project_id,
            issuance_id: body.issuance_id,
            meta_json: body.meta_json.map(|v| v.to_string()),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(InitResponseBody {
            upload_id: response.upload_id,
            token: response.token,
            put_url: response.put_url,
            bucket_key: response.bucket_key,
            expires_at: response.expires_at,
        }),
    ))
}

/// POST /v1/upload/complete
pub async fn complete(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Json(body): Json<CompleteBody>,
) -> Result<Json<CompleteResponseBody>, ApiError> {
    require_app(&context)?;

    // The upload token is the second factor binding this call to the
    // session minted at init; verifiable without a catalog lookup.
    state
        .upload_tokens
        .verify(&body.token, &body.upload_id)
        .map_err(ApiError::Auth)?;

    debug!(upload_id = %body.upload_id, "Upload complete requested");

    let descriptor = state.ingest.complete(&body.upload_id).await?;
    Ok(Json(descriptor.into()))
}
