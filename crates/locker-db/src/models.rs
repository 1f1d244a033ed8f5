//! Catalog models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::utils::parse_datetime_or_now;

/// Antivirus scan status of an artifact
///
/// Independent of the integrity state machine; rescans are driven
/// through the admin surface.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScanStatus {
    Pending,
    Clean,
    Infected,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Pending => "PENDING",
            ScanStatus::Clean => "CLEAN",
            ScanStatus::Infected => "INFECTED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(ScanStatus::Pending),
            "CLEAN" => Some(ScanStatus::Clean),
            "INFECTED" => Some(ScanStatus::Infected),
            _ => None,
        }
    }
}

/// Upload session status
///
/// `Complete`, `Aborted` and `Expired` are terminal: once a session
/// leaves `Pending` its status and completion timestamp are frozen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    Pending,
    Complete,
    Aborted,
    Expired,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "PENDING",
            SessionStatus::Complete => "COMPLETE",
            SessionStatus::Aborted => "ABORTED",
            SessionStatus::Expired => "EXPIRED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(SessionStatus::Pending),
            "COMPLETE" => Some(SessionStatus::Complete),
            "ABORTED" => Some(SessionStatus::Aborted),
            "EXPIRED" => Some(SessionStatus::Expired),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Pending)
    }
}

/// The authoritative record of a unique stored blob, keyed by digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    /// Lowercase 64-hex SHA-256. Unique across all artifacts.
    pub digest: String,
    pub size_bytes: i64,
    pub mime: String,
    pub filename: String,
    /// Location of the canonical bytes in the object store.
    pub bucket_key: String,
    /// Optional content identifier in the secondary network.
    pub cid_v1: Option<String>,
    pub uploader_org_id: Option<String>,
    pub project_id: Option<String>,
    pub issuance_id: Option<String>,
    pub meta_json: Option<String>,
    pub verified_at: DateTime<Utc>,
    pub scan_status: ScanStatus,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<&SqliteRow> for Artifact {
    type Error = sqlx::Error;

    fn try_from(row: &SqliteRow) -> Result<Self, Self::Error> {
        Ok(Artifact {
            id: row.try_get("id")?,
            digest: row.try_get("digest")?,
            size_bytes: row.try_get("size_bytes")?,
            mime: row.try_get("mime")?,
            filename: row.try_get("filename")?,
            bucket_key: row.try_get("bucket_key")?,
            cid_v1: row.try_get("cid_v1")?,
            uploader_org_id: row.try_get("uploader_org_id")?,
            project_id: row.try_get("project_id")?,
            issuance_id: row.try_get("issuance_id")?,
            meta_json: row.try_get("meta_json")?,
            verified_at: parse_datetime_or_now(row.try_get("verified_at")?),
            scan_status: ScanStatus::from_str(row.try_get("scan_status")?)
                .unwrap_or(ScanStatus::Pending),
            created_at: parse_datetime_or_now(row.try_get("created_at")?),
        })
    }
}

/// New artifact (for insertion)
#[derive(Debug, Clone)]
pub struct NewArtifact {
    pub id: String,
    pub digest: String,
    pub size_bytes: i64,
    pub mime: String,
    pub filename: String,
    pub bucket_key: String,
    pub uploader_org_id: Option<String>,
    pub project_id: Option<String>,
    pub issuance_id: Option<String>,
    pub meta_json: Option<String>,
    pub verified_at: DateTime<Utc>,
}

/// The transient ticket issued to a caller between the init and
/// complete phases of an upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSession {
    pub id: String,
    /// Opaque second factor bound to the id.
    pub token: String,
    pub declared_digest: Option<String>,
    pub filename: String,
    pub expected_size: Option<i64>,
    pub mime_hint: Option<String>,
    /// Staging key in the object store the caller uploads to.
    pub bucket_key: String,
    pub uploader_org_id: Option<String>,
    pub project_id: Option<String>,
    pub issuance_id: Option<String>,
    pub meta_json: Option<String>,
    pub status: SessionStatus,
    /// Set in the same transition that marks the session COMPLETE.
    pub artifact_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<&SqliteRow> for UploadSession {
    type Error = sqlx::Error;

    fn try_from(row: &SqliteRow) -> Result<Self, Self::Error> {
        let completed_at: Option<String> = row.try_get("completed_at")?;
        Ok(UploadSession {
            id: row.try_get("id")?,
            token: row.try_get("token")?,
            declared_digest: row.try_get("declared_digest")?,
            filename: row.try_get("filename")?,
            expected_size: row.try_get("expected_size")?,
            mime_hint: row.try_get("mime_hint")?,
            bucket_key: row.try_get("bucket_key")?,
            uploader_org_id: row.try_get("uploader_org_id")?,
            project_id: row.try_get("project_id")?,
            issuance_id: row.try_get("issuance_id")?,
            meta_json: row.try_get("meta_json")?,
            status: SessionStatus::from_str(row.try_get("status")?)
                .unwrap_or(SessionStatus::Pending),
            artifact_id: row.try_get("artifact_id")?,
            created_at: parse_datetime_or_now(row.try_get("created_at")?),
            expires_at: parse_datetime_or_now(row.try_get("expires_at")?),
            completed_at: completed_at.as_deref().map(parse_datetime_or_now),
        })
    }
}

/// New upload session (for insertion)
#[derive(Debug, Clone)]
pub struct NewUploadSession {
    pub id: String,
    pub token: String,
    pub declared_digest: Option<String>,
    pub filename: String,
    pub expected_size: Option<i64>,
    pub mime_hint: Option<String>,
    pub bucket_key: String,
    pub uploader_org_id: Option<String>,
    pub project_id: Option<String>,
    pub issuance_id: Option<String>,
    pub meta_json: Option<String>,
    pub expires_at: DateTime<Utc>,
}
