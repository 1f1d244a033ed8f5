//! Admin controller
//!
//! Retention sweeps, secondary-replica pin management, and integrity
//! rescans. All operations are gated on the admin application key at
//! the API layer.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{info, warn};

use locker_db::{Artifact, Database, ScanStatus};
use locker_ipfs::{ReplicaBackend, ReplicaStream};
use locker_storage::StorageBackend;

use crate::digest;
use crate::error::CoreError;

/// Outcome of a retention sweep
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub dry_run: bool,
    /// Deleted artifacts, or candidates when dry-run
    pub artifacts: Vec<Artifact>,
}

/// Outcome of an admin pin
#[derive(Debug, Clone)]
pub struct PinSummary {
    pub cid: String,
    pub gateway_url: String,
    /// False when the artifact was already pinned
    pub newly_pinned: bool,
}

/// Outcome of an integrity rescan
#[derive(Debug, Clone)]
pub struct RescanSummary {
    pub sha256_hex: String,
    pub scan_status: ScanStatus,
    pub verified_at: DateTime<Utc>,
}

/// Administrative lifecycle operations
pub struct AdminService {
    db: Database,
    storage: Arc<dyn StorageBackend>,
    replica: Option<Arc<dyn ReplicaBackend>>,
}

impl AdminService {
    pub fn new(
        db: Database,
        storage: Arc<dyn StorageBackend>,
        replica: Option<Arc<dyn ReplicaBackend>>,
    ) -> Self {
        Self {
            db,
            storage,
            replica,
        }
    }

    fn require_replica(&self) -> Result<&Arc<dyn ReplicaBackend>, CoreError> {
        self.replica.as_ref().ok_or(CoreError::ReplicaUnavailable)
    }

    async fn find_artifact(&self, digest: &str) -> Result<Artifact, CoreError> {
        let normalized = digest::normalize_digest(digest);
        if !digest::is_valid_digest(&normalized) {
            return Err(CoreError::Validation(format!(
                "not a 64-hex SHA-256 digest: {}",
                digest
            )));
        }
        self.db
            .find_artifact_by_digest(&normalized)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("artifact {}", normalized)))
    }

    /// Delete artifacts created before the cutoff.
    ///
    /// Per-artifact failures are logged and the sweep continues; the
    /// returned list enumerates only artifacts that were actually
    /// deleted from both the object store and the catalog.
    pub async fn retention_sweep(
        &self,
        before: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<SweepOutcome, CoreError> {
        let candidates = self.db.list_artifacts_created_before(before).await?;

        if dry_run {
            info!(
                count = candidates.len(),
                cutoff = %before,
                "Retention sweep dry run"
            );
            return Ok(SweepOutcome {
                dry_run,
                artifacts: candidates,
            });
        }

        let mut deleted = Vec::new();
        for artifact in candidates {
            if let Err(e) = self.storage.delete(&artifact.bucket_key).await {
                warn!(digest = %artifact.digest, "Sweep failed to delete object: {}", e);
                continue;
            }
            match self.db.delete_artifact(&artifact.id).await {
                Ok(_) => deleted.push(artifact),
                Err(e) => {
                    warn!(digest = %artifact.digest, "Sweep failed to delete catalog row: {}", e);
                }
            }
        }

        info!(count = deleted.len(), cutoff = %before, "Retention sweep completed");
        Ok(SweepOutcome {
            dry_run,
            artifacts: deleted,
        })
    }

    /// Pin an artifact to the secondary network, reusing an existing cid
    pub async fn pin(&self, digest: &str) -> Result<PinSummary, CoreError> {
        let artifact = self.find_artifact(digest).await?;
        let replica = self.require_replica()?;

        if let Some(cid) = artifact.cid_v1 {
            return Ok(PinSummary {
                gateway_url: replica.gateway_url(&cid),
                cid,
                newly_pinned: false,
            });
        }

        let stream = self.storage.get(&artifact.bucket_key).await?;
        let stream: ReplicaStream =
            Box::pin(stream.map(|chunk| chunk.map_err(std::io::Error::other)));
        let outcome = replica.pin(stream).await?;

        self.db.set_artifact_cid(&artifact.id, Some(&outcome.cid)).await?;
        info!(digest = %artifact.digest, cid = %outcome.cid, "Artifact pinned");

        Ok(PinSummary {
            gateway_url: replica.gateway_url(&outcome.cid),
            cid: outcome.cid,
            newly_pinned: true,
        })
    }

    /// Unpin an artifact. A null cid is tolerated as a no-op success.
    pub async fn unpin(&self, digest: &str) -> Result<Option<String>, CoreError> {
        let artifact = self.find_artifact(digest).await?;

        let Some(cid) = artifact.cid_v1 else {
            return Ok(None);
        };

        let replica = self.require_replica()?;
        replica.unpin(&cid).await?;
        self.db.set_artifact_cid(&artifact.id, None).await?;
        info!(digest = %artifact.digest, cid = %cid, "Artifact unpinned");

        Ok(Some(cid))
    }

    /// Re-stream the stored object and compare against the catalog digest.
    /// A mismatch flags potential corruption and leaves the scan status
    /// untouched.
    pub async fn rescan(&self, digest: &str) -> Result<RescanSummary, CoreError> {
        let artifact = self.find_artifact(digest).await?;

        let stream = self.storage.get(&artifact.bucket_key).await?;
        let observed = digest::hash_stream(stream).await?;

        if observed.digest != artifact.digest {
            warn!(
                digest = %artifact.digest,
                observed = %observed.digest,
                "Rescan found stored bytes diverging from catalog digest"
            );
            return Err(CoreError::Corruption {
                expected: artifact.digest,
                actual: observed.digest,
            });
        }

        let now = Utc::now();
        self.db
            .set_artifact_scan_status(&artifact.id, ScanStatus::Clean, now)
            .await?;
        info!(digest = %artifact.digest, "Rescan verified artifact");

        Ok(RescanSummary {
            sha256_hex: artifact.digest,
            scan_status: ScanStatus::Clean,
            verified_at: now,
        })
    }
}
