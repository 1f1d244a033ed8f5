//! Retrieval controller
//!
//! Serves artifacts back by digest: presigned downloads, authenticated
//! metadata, and the unauthenticated existence probe. The probe answers
//! from the catalog only and never reveals whether the bytes are
//! currently readable.

use std::sync::Arc;
use std::time::Duration;

use locker_db::{Artifact, Database};
use locker_storage::{PresignOperation, StorageBackend};

use crate::digest;
use crate::error::CoreError;

/// Existence probe result
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub exists: bool,
    pub artifact: Option<Artifact>,
}

/// Digest → artifact lookups and presigned downloads
pub struct RetrievalService {
    db: Database,
    storage: Arc<dyn StorageBackend>,
    download_url_ttl: Duration,
}

impl RetrievalService {
    pub fn new(db: Database, storage: Arc<dyn StorageBackend>, download_url_ttl: Duration) -> Self {
        Self {
            db,
            storage,
            download_url_ttl,
        }
    }

    fn normalize(digest: &str) -> Result<String, CoreError> {
        let normalized = digest::normalize_digest(digest);
        if !digest::is_valid_digest(&normalized) {
            return Err(CoreError::Validation(format!(
                "not a 64-hex SHA-256 digest: {}",
                digest
            )));
        }
        Ok(normalized)
    }

    /// Produce a presigned GET URL for the artifact with this digest
    pub async fn download_url(&self, digest: &str) -> Result<String, CoreError> {
        let normalized = Self::normalize(digest)?;
        let artifact = self
            .db
            .find_artifact_by_digest(&normalized)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("artifact {}", normalized)))?;

        let url = self
            .storage
            .presign(PresignOperation::Get, &artifact.bucket_key, self.download_url_ttl)
            .await?;

        metrics::counter!("evidence_download_total").increment(1);
        Ok(url)
    }

    /// Full artifact descriptor for authenticated callers
    pub async fn metadata(&self, digest: &str) -> Result<Artifact, CoreError> {
        let normalized = Self::normalize(digest)?;
        self.db
            .find_artifact_by_digest(&normalized)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("artifact {}", normalized)))
    }

    /// Cheap existence probe; catalog is the source of truth.
    /// Malformed digests report a plain "does not exist".
    pub async fn verify(&self, digest: &str) -> Result<VerifyOutcome, CoreError> {
        let normalized = digest::normalize_digest(digest);
        if !digest::is_valid_digest(&normalized) {
            return Ok(VerifyOutcome {
                exists: false,
                artifact: None,
            });
        }

        let artifact = self.db.find_artifact_by_digest(&normalized).await?;
        Ok(VerifyOutcome {
            exists: artifact.is_some(),
            artifact,
        })
    }
}
