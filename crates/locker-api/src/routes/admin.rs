//! Admin endpoints
//!
//! All routes here sit behind the admin application gate.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepBody {
    pub before_date: DateTime<Utc>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestBody {
    pub digest: String,
}

/// POST /v1/admin/retention/sweep
pub async fn retention_sweep(
    State(state): State<AppState>,
    Json(body): Json<SweepBody>,
) -> Result<Json<Value>, ApiError> {
    debug!(before = %body.before_date, dry_run = body.dry_run, "Retention sweep requested");

    let outcome = state.admin.retention_sweep(body.before_date, body.dry_run).await?;

    let artifacts: Vec<Value> = outcome
        .artifacts
        .iter()
        .map(|a| {
            json!({
                "artifactId": a.id,
                "sha256Hex": a.digest,
                "sizeBytes": a.size_bytes,
                "createdAt": a.created_at,
            })
        })
        .collect();

    let count = artifacts.len();
    let mut response = json!({
        "dryRun": outcome.dry_run,
        "artifacts": artifacts,
    });
    let count_field = if outcome.dry_run { "artifactsToDelete" } else { "artifactsDeleted" };
    response[count_field] = json!(count);
    Ok(Json(response))
}

/// POST /v1/admin/ipfs/pin
pub async fn ipfs_pin(
    State(state): State<AppState>,
    Json(body): Json<DigestBody>,
) -> Result<Json<Value>, ApiError> {
    let summary = state.admin.pin(&body.digest).await?;

    let message = if summary.newly_pinned {
        "artifact pinned"
    } else {
        "artifact already pinned"
    };
    Ok(Json(json!({
        "message": message,
        "cidV1": summary.cid,
        "gatewayUrl": summary.gateway_url,
    })))
}

/// POST /v1/admin/ipfs/unpin
pub async fn ipfs_unpin(
    State(state): State<AppState>,
    Json(body): Json<DigestBody>,
) -> Result<Json<Value>, ApiError> {
    let unpinned = state.admin.unpin(&body.digest).await?;

    let response = match unpinned {
        Some(cid) => json!({ "message": "artifact unpinned", "cidV1": cid }),
        None => json!({ "message": "artifact was not pinned" }),
    };
    Ok(Json(response))
}

/// POST /v1/admin/rescan
pub async fn rescan(
    State(state): State<AppState>,
    Json(body): Json<DigestBody>,
) -> Result<Json<Value>, ApiError> {
    let summary = state.admin.rescan(&body.digest).await?;

    Ok(Json(json!({
        "message": "artifact verified",
        "sha256Hex": summary.sha256_hex,
        "scanStatus": summary.scan_status,
        "verifiedAt": summary.verified_at,
    })))
}
