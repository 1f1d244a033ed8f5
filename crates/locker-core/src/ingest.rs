//! Ingestion controller
//!
//! Implements the two-phase upload protocol: `init` persists a PENDING
//! session and hands back a presigned PUT URL; the caller uploads
//! directly to the object store; `complete` streams the staged object
//! through the digest engine, dedupes against the catalog, and drives
//! the session to a terminal state. Secondary replication is best-effort
//! and must never roll back the primary write.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::{info, warn};
use uuid::Uuid;

use locker_auth::UploadTokenSigner;
use locker_db::{Artifact, Database, NewArtifact, NewUploadSession, SessionStatus, UploadSession};
use locker_ipfs::{PinOutcome, ReplicaBackend, ReplicaStream};
use locker_storage::{PresignOperation, StorageBackend};

use crate::digest::{self, DigestOutput};
use crate::error::CoreError;
use crate::keys;
use crate::mime;

const PRESIGN_ATTEMPTS: u32 = 3;
const PRESIGN_BACKOFF: StdDuration = StdDuration::from_millis(100);

/// Ingestion configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: u64,
    /// Lifetime of an upload session (and of its presigned PUT URL)
    pub session_ttl: chrono::Duration,
    /// Lifetime of presigned download URLs in complete responses
    pub download_url_ttl: StdDuration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 52_428_800,
            session_ttl: chrono::Duration::minutes(5),
            download_url_ttl: StdDuration::from_secs(300),
        }
    }
}

/// Inputs to the init phase
#[derive(Debug, Clone, Default)]
pub struct InitRequest {
    pub filename: String,
    pub size_bytes: Option<u64>,
    pub mime_hint: Option<String>,
    pub declared_digest: Option<String>,
    pub uploader_org_id: Option<String>,
    pub project_id: Option<String>,
    pub issuance_id: Option<String>,
    pub meta_json: Option<String>,
}

/// Ticket returned by the init phase
#[derive(Debug, Clone)]
pub struct InitResponse {
    pub upload_id: String,
    pub token: String,
    pub put_url: String,
    pub bucket_key: String,
    pub expires_at: DateTime<Utc>,
}

/// Artifact descriptor returned by the complete phase
#[derive(Debug, Clone)]
pub struct ArtifactDescriptor {
    pub artifact_id: String,
    pub sha256_hex: String,
    pub size_bytes: i64,
    pub mime: String,
    pub bucket_key: String,
    pub cid_v1: Option<String>,
    pub download_url: String,
}

/// The two-phase upload controller
pub struct IngestService {
    db: Database,
    storage: Arc<dyn StorageBackend>,
    replica: Option<Arc<dyn ReplicaBackend>>,
    tokens: UploadTokenSigner,
    config: IngestConfig,
}

impl IngestService {
    pub fn new(
        db: Database,
        storage: Arc<dyn StorageBackend>,
        replica: Option<Arc<dyn ReplicaBackend>>,
        tokens: UploadTokenSigner,
        config: IngestConfig,
    ) -> Self {
        Self {
            db,
            storage,
            replica,
            tokens,
            config,
        }
    }

    /// Init phase: validate inputs, persist a PENDING session, and hand
    /// back a presigned PUT URL with a TTL matching the session.
    ///
    /// Failures are total: nothing is persisted if any step fails.
    pub async fn init(&self, request: InitRequest) -> Result<InitResponse, CoreError> {
        if request.filename.trim().is_empty() {
            return Err(CoreError::Validation("filename is required".to_string()));
        }

        if let Some(size) = request.size_bytes {
            if size > self.config.max_upload_bytes {
                return Err(CoreError::FileTooLarge {
                    size_bytes: size,
                    max_bytes: self.config.max_upload_bytes,
                });
            }
        }

        if let Some(hint) = &request.mime_hint {
            mime::validate(hint)?;
        }

        let declared_digest = match &request.declared_digest {
            Some(raw) => {
                let normalized = digest::normalize_digest(raw);
                if !digest::is_valid_digest(&normalized) {
                    return Err(CoreError::Validation(format!(
                        "declared digest is not a 64-hex SHA-256: {}",
                        raw
                    )));
                }
                Some(normalized)
            }
            None => None,
        };

        let upload_id = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + self.config.session_ttl;
        let token = self
            .tokens
            .issue(&upload_id, expires_at)
            .map_err(|e| CoreError::Internal(format!("failed to issue upload token: {}", e)))?;

        // With a declared digest the staging key is already canonical;
        // otherwise a random seed keeps it unique per session and the
        // final key is rewritten from the actual digest at complete.
        let key_seed = declared_digest
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let bucket_key = keys::bucket_key(&key_seed, &request.filename);

        // Presign before persisting so a failed init leaves no footprint
        let put_url = self.presign_put_with_retry(&bucket_key).await?;

        self.db
            .create_session(NewUploadSession {
                id: upload_id.clone(),
                token: token.clone(),
                declared_digest,
                filename: request.filename,
                expected_size: request.size_bytes.map(|s| s as i64),
                mime_hint: request.mime_hint,
                bucket_key: bucket_key.clone(),
                uploader_org_id: request.uploader_org_id,
                project_id: request.project_id,
                issuance_id: request.issuance_id,
                meta_json: request.meta_json,
                expires_at,
            })
            .await?;

        metrics::counter!("evidence_upload_init_total").increment(1);
        info!(upload_id, bucket_key, "Upload session initialized");

        Ok(InitResponse {
            upload_id,
            token,
            put_url,
            bucket_key,
            expires_at,
        })
    }

    /// Complete phase: verify the staged bytes, dedupe, and drive the
    /// session to a terminal state. Idempotent for completed sessions.
    pub async fn complete(&self, upload_id: &str) -> Result<ArtifactDescriptor, CoreError> {
        let session = self
            .db
            .find_session(upload_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("upload session {}", upload_id)))?;

        match session.status {
            SessionStatus::Pending => {}
            SessionStatus::Complete => return self.completed_descriptor(&session).await,
            SessionStatus::Aborted => return Err(CoreError::SessionAborted),
            SessionStatus::Expired => return Err(CoreError::SessionExpired),
        }

        let now = Utc::now();
        if session.expires_at < now {
            self.db
                .update_session_status(upload_id, SessionStatus::Expired, None, None, SessionStatus::Pending)
                .await?;
            metrics::counter!("evidence_upload_failures_total").increment(1);
            return Err(CoreError::SessionExpired);
        }

        if session.bucket_key.is_empty() {
            return Err(CoreError::Validation(
                "upload session has no staging key".to_string(),
            ));
        }

        let staged = self.storage.get(&session.bucket_key).await?;
        let DigestOutput { digest, size_bytes } = digest::hash_stream(staged).await?;

        if let Some(declared) = &session.declared_digest {
            if declared != &digest {
                self.db
                    .update_session_status(upload_id, SessionStatus::Aborted, None, None, SessionStatus::Pending)
                    .await?;
                metrics::counter!("evidence_upload_failures_total").increment(1);
                warn!(
                    upload_id,
                    declared,
                    actual = digest,
                    "Declared digest mismatch; session aborted"
                );
                return Err(CoreError::HashMismatch {
                    declared: declared.clone(),
                    actual: digest,
                });
            }
        }

        // Canonical key comes from the actual digest, not the staging seed
        let canonical_key = keys::bucket_key(&digest, &session.filename);

        let (mut artifact, created) = match self.db.find_artifact_by_digest(&digest).await? {
            Some(existing) => (existing, false),
            None => {
                // The catalog must never advertise a key the bytes are not at
                if canonical_key != session.bucket_key {
                    self.storage.copy(&session.bucket_key, &canonical_key).await?;
                }
                let candidate = NewArtifact {
                    id: Uuid::new_v4().to_string(),
                    digest: digest.clone(),
                    size_bytes: size_bytes as i64,
                    mime: session
                        .mime_hint
                        .clone()
                        .unwrap_or_else(|| mime::DEFAULT_MIME.to_string()),
                    filename: keys::sanitize_filename(&session.filename),
                    bucket_key: canonical_key,
                    uploader_org_id: session.uploader_org_id.clone(),
                    project_id: session.project_id.clone(),
                    issuance_id: session.issuance_id.clone(),
                    meta_json: session.meta_json.clone(),
                    verified_at: now,
                };
                self.db.create_artifact_if_absent(candidate).await?
            }
        };

        // Staged bytes are redundant once the canonical object is in place
        if session.bucket_key != artifact.bucket_key {
            if let Err(e) = self.storage.delete(&session.bucket_key).await {
                warn!(upload_id, key = %session.bucket_key, "Failed to delete staged object: {}", e);
            }
        }

        // Secondary replication must never fail the request; dedup hits
        // are already pinned (or deliberately not) and are skipped.
        if created {
            if let Some(replica) = &self.replica {
                match self.pin_to_replica(replica.as_ref(), &artifact.bucket_key).await {
                    Ok(outcome) => {
                        self.db.set_artifact_cid(&artifact.id, Some(&outcome.cid)).await?;
                        artifact.cid_v1 = Some(outcome.cid);
                    }
                    Err(e) => {
                        metrics::counter!("evidence_pin_failures_total").increment(1);
                        warn!(
                            upload_id,
                            digest = %artifact.digest,
                            "Secondary replication failed: {}",
                            e
                        );
                    }
                }
            }
        }

        let won = self
            .db
            .update_session_status(
                upload_id,
                SessionStatus::Complete,
                Some(now),
                Some(&artifact.id),
                SessionStatus::Pending,
            )
            .await?;
        if !won {
            // Lost the transition race; the winner determined the outcome
            let current = self
                .db
                .find_session(upload_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("upload session {}", upload_id)))?;
            return match current.status {
                SessionStatus::Complete => self.completed_descriptor(&current).await,
                SessionStatus::Aborted => Err(CoreError::SessionAborted),
                SessionStatus::Expired => Err(CoreError::SessionExpired),
                SessionStatus::Pending => Err(CoreError::Internal(
                    "session transition lost without a winner".to_string(),
                )),
            };
        }

        if created {
            info!(upload_id, digest = %artifact.digest, "Artifact created");
        } else {
            metrics::counter!("evidence_dedup_total").increment(1);
            info!(upload_id, digest = %artifact.digest, "Upload deduplicated onto existing artifact");
        }
        metrics::counter!("evidence_upload_complete_total").increment(1);

        self.descriptor(artifact).await
    }

    /// Descriptor for a session that already reached COMPLETE
    async fn completed_descriptor(
        &self,
        session: &UploadSession,
    ) -> Result<ArtifactDescriptor, CoreError> {
        let artifact_id = session.artifact_id.as_deref().ok_or_else(|| {
            CoreError::Internal("completed session has no linked artifact".to_string())
        })?;
        let artifact = self
            .db
            .find_artifact(artifact_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("artifact {}", artifact_id)))?;
        self.descriptor(artifact).await
    }

    async fn descriptor(&self, artifact: Artifact) -> Result<ArtifactDescriptor, CoreError> {
        let download_url = self
            .storage
            .presign(
                PresignOperation::Get,
                &artifact.bucket_key,
                self.config.download_url_ttl,
            )
            .await?;

        Ok(ArtifactDescriptor {
            artifact_id: artifact.id,
            sha256_hex: artifact.digest,
            size_bytes: artifact.size_bytes,
            mime: artifact.mime,
            bucket_key: artifact.bucket_key,
            cid_v1: artifact.cid_v1,
            download_url,
        })
    }

    async fn pin_to_replica(
        &self,
        replica: &dyn ReplicaBackend,
        key: &str,
    ) -> Result<PinOutcome, CoreError> {
        let stream = self.storage.get(key).await?;
        let stream: ReplicaStream =
            Box::pin(stream.map(|chunk| chunk.map_err(std::io::Error::other)));
        Ok(replica.pin(stream).await?)
    }

    async fn presign_put_with_retry(&self, key: &str) -> Result<String, CoreError> {
        let ttl = self
            .config
            .session_ttl
            .to_std()
            .unwrap_or(StdDuration::from_secs(300));

        let mut attempt = 0;
        loop {
            match self.storage.presign(PresignOperation::Put, key, ttl).await {
                Ok(url) => return Ok(url),
                Err(e) if attempt + 1 < PRESIGN_ATTEMPTS => {
                    attempt += 1;
                    warn!(key, attempt, "Presign failed, retrying: {}", e);
                    tokio::time::sleep(PRESIGN_BACKOFF * attempt).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::stream;
    use locker_ipfs::IpfsError;
    use locker_storage::{ByteStream, LocalStorage};

    const HELLO_DIGEST: &str = "7509e5bda0c762d2bac7f90d758b5b2263fa01ccbc542ab5e3df163be08e6ca9";
    const HI_DIGEST: &str = "8f434346648f6b96df89dda901c5176b10a6d83961dd3c1ac88b59b2dc327aa4";

    struct StubReplica;

    #[async_trait]
    impl ReplicaBackend for StubReplica {
        async fn pin(&self, mut stream: ReplicaStream) -> Result<PinOutcome, IpfsError> {
            let mut size = 0u64;
            while let Some(chunk) = stream.next().await {
                size += chunk.map_err(|e| IpfsError::InvalidResponse(e.to_string()))?.len() as u64;
            }
            Ok(PinOutcome {
                cid: "bafytestcid".to_string(),
                size,
            })
        }

        async fn unpin(&self, _cid: &str) -> Result<(), IpfsError> {
            Ok(())
        }

        fn gateway_url(&self, cid: &str) -> String {
            format!("https://ipfs.io/ipfs/{}", cid)
        }
    }

    struct FailingReplica;

    #[async_trait]
    impl ReplicaBackend for FailingReplica {
        async fn pin(&self, _stream: ReplicaStream) -> Result<PinOutcome, IpfsError> {
            Err(IpfsError::Api {
                status: 500,
                message: "node down".to_string(),
            })
        }

        async fn unpin(&self, _cid: &str) -> Result<(), IpfsError> {
            Err(IpfsError::Api {
                status: 500,
                message: "node down".to_string(),
            })
        }

        fn gateway_url(&self, cid: &str) -> String {
            format!("https://ipfs.io/ipfs/{}", cid)
        }
    }

    struct Harness {
        service: IngestService,
        db: Database,
        storage: Arc<LocalStorage>,
        _dir: tempfile::TempDir,
    }

    async fn harness_with(
        replica: Option<Arc<dyn ReplicaBackend>>,
        config: IngestConfig,
    ) -> Harness {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Arc::new(
            LocalStorage::new(dir.path().join("objects"))
                .await
                .expect("local storage"),
        );
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("catalog.db").display());
        let db = Database::new(&url).await.expect("database");
        let service = IngestService::new(
            db.clone(),
            storage.clone(),
            replica,
            UploadTokenSigner::new("test-secret"),
            config,
        );
        Harness {
            service,
            db,
            storage,
            _dir: dir,
        }
    }

    async fn harness() -> Harness {
        harness_with(None, IngestConfig::default()).await
    }

    fn body(data: &'static [u8]) -> ByteStream {
        Box::pin(stream::once(async move { Ok(Bytes::from_static(data)) }))
    }

    async fn upload(harness: &Harness, init: &InitResponse, data: &'static [u8]) {
        harness
            .storage
            .put(&init.bucket_key, body(data), "application/octet-stream", None)
            .await
            .expect("staged upload");
    }

    fn init_request(filename: &str) -> InitRequest {
        InitRequest {
            filename: filename.to_string(),
            size_bytes: Some(12),
            mime_hint: Some("application/pdf".to_string()),
            uploader_org_id: Some("org-1".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_happy_path() {
        let h = harness().await;

        let init = h.service.init(init_request("e.pdf")).await.unwrap();
        assert!(!init.token.is_empty());
        assert!(init.put_url.starts_with("file://"));

        upload(&h, &init, b"hello world!").await;

        let done = h.service.complete(&init.upload_id).await.unwrap();
        assert_eq!(done.sha256_hex, HELLO_DIGEST);
        assert_eq!(done.size_bytes, 12);
        assert_eq!(done.mime, "application/pdf");
        assert_eq!(done.bucket_key, format!("sha256/75/09/{}/e.pdf", HELLO_DIGEST));

        let session = h.db.find_session(&init.upload_id).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Complete);
        assert_eq!(session.artifact_id.as_deref(), Some(done.artifact_id.as_str()));
        assert!(session.completed_at.is_some());

        // I2: the bytes live at the canonical key
        assert!(h.storage.head(&done.bucket_key).await.unwrap());
    }

    #[tokio::test]
    async fn test_canonical_key_rewrite_without_declared_digest() {
        let h = harness().await;

        let init = h.service.init(init_request("e.pdf")).await.unwrap();
        // Staging key was seeded randomly, not from the content digest
        assert!(!init.bucket_key.contains(HELLO_DIGEST));

        upload(&h, &init, b"hello world!").await;
        let done = h.service.complete(&init.upload_id).await.unwrap();

        assert_eq!(done.bucket_key, format!("sha256/75/09/{}/e.pdf", HELLO_DIGEST));
        assert!(h.storage.head(&done.bucket_key).await.unwrap());
        // The staged object was cleaned up after the copy
        assert!(!h.storage.head(&init.bucket_key).await.unwrap());
    }

    #[tokio::test]
    async fn test_declared_digest_stages_at_canonical_key() {
        let h = harness().await;

        let mut request = init_request("e.pdf");
        request.declared_digest = Some(format!("0x{}", HELLO_DIGEST.to_uppercase()));
        let init = h.service.init(request).await.unwrap();
        assert_eq!(init.bucket_key, format!("sha256/75/09/{}/e.pdf", HELLO_DIGEST));

        upload(&h, &init, b"hello world!").await;
        let done = h.service.complete(&init.upload_id).await.unwrap();
        assert_eq!(done.bucket_key, init.bucket_key);
        assert!(h.storage.head(&done.bucket_key).await.unwrap());
    }

    #[tokio::test]
    async fn test_hash_mismatch_aborts_session() {
        let h = harness().await;

        let mut request = init_request("e.pdf");
        request.declared_digest = Some("0".repeat(64));
        let init = h.service.init(request).await.unwrap();

        upload(&h, &init, b"hi").await;

        match h.service.complete(&init.upload_id).await {
            Err(CoreError::HashMismatch { declared, actual }) => {
                assert_eq!(declared, "0".repeat(64));
                assert_eq!(actual, HI_DIGEST);
            }
            other => panic!("expected HashMismatch, got {:?}", other.map(|_| ())),
        }

        let session = h.db.find_session(&init.upload_id).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Aborted);
        assert_eq!(h.db.artifact_count().await.unwrap(), 0);

        // The abort is sticky: retrying does not resurrect the session
        assert!(matches!(
            h.service.complete(&init.upload_id).await,
            Err(CoreError::SessionAborted)
        ));
    }

    #[tokio::test]
    async fn test_dedup_returns_same_artifact() {
        let h = harness().await;

        let first = h.service.init(init_request("e.pdf")).await.unwrap();
        upload(&h, &first, b"hello world!").await;
        let a = h.service.complete(&first.upload_id).await.unwrap();

        let second = h.service.init(init_request("other-name.pdf")).await.unwrap();
        upload(&h, &second, b"hello world!").await;
        let b = h.service.complete(&second.upload_id).await.unwrap();

        assert_eq!(a.artifact_id, b.artifact_id);
        assert_eq!(h.db.artifact_count().await.unwrap(), 1);

        // Both sessions completed, each leaving exactly one terminal footprint
        let s1 = h.db.find_session(&first.upload_id).await.unwrap().unwrap();
        let s2 = h.db.find_session(&second.upload_id).await.unwrap().unwrap();
        assert_eq!(s1.status, SessionStatus::Complete);
        assert_eq!(s2.status, SessionStatus::Complete);
    }

    #[tokio::test]
    async fn test_complete_is_idempotent() {
        let h = harness().await;

        let init = h.service.init(init_request("e.pdf")).await.unwrap();
        upload(&h, &init, b"hello world!").await;

        let first = h.service.complete(&init.upload_id).await.unwrap();
        let session_after_first = h.db.find_session(&init.upload_id).await.unwrap().unwrap();

        let second = h.service.complete(&init.upload_id).await.unwrap();
        let session_after_second = h.db.find_session(&init.upload_id).await.unwrap().unwrap();

        assert_eq!(first.artifact_id, second.artifact_id);
        assert_eq!(h.db.artifact_count().await.unwrap(), 1);
        assert_eq!(
            session_after_first.completed_at,
            session_after_second.completed_at
        );
    }

    #[tokio::test]
    async fn test_expired_session_rejected() {
        let mut config = IngestConfig::default();
        config.session_ttl = chrono::Duration::seconds(-1);
        let h = harness_with(None, config).await;

        let init = h.service.init(init_request("e.pdf")).await.unwrap();
        upload(&h, &init, b"hello world!").await;

        assert!(matches!(
            h.service.complete(&init.upload_id).await,
            Err(CoreError::SessionExpired)
        ));

        let session = h.db.find_session(&init.upload_id).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Expired);
        assert!(session.completed_at.is_none());

        // Expiry is terminal too
        assert!(matches!(
            h.service.complete(&init.upload_id).await,
            Err(CoreError::SessionExpired)
        ));
    }

    #[tokio::test]
    async fn test_init_rejects_disallowed_mime() {
        let h = harness().await;
        let mut request = init_request("setup.exe");
        request.mime_hint = Some("application/x-msdownload".to_string());
        assert!(matches!(
            h.service.init(request).await,
            Err(CoreError::UnsupportedMime(_))
        ));
    }

    #[tokio::test]
    async fn test_init_rejects_oversized_declaration() {
        let h = harness().await;
        let mut request = init_request("big.zip");
        request.size_bytes = Some(60 * 1024 * 1024);
        request.mime_hint = Some("application/zip".to_string());
        assert!(matches!(
            h.service.init(request).await,
            Err(CoreError::FileTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_init_rejects_malformed_declared_digest() {
        let h = harness().await;
        let mut request = init_request("e.pdf");
        request.declared_digest = Some("not-a-digest".to_string());
        assert!(matches!(
            h.service.init(request).await,
            Err(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_complete_unknown_session() {
        let h = harness().await;
        assert!(matches!(
            h.service.complete("no-such-upload").await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_complete_without_staged_object_is_storage_error() {
        let h = harness().await;
        let init = h.service.init(init_request("e.pdf")).await.unwrap();
        // No PUT happened; the staged object is absent
        assert!(matches!(
            h.service.complete(&init.upload_id).await,
            Err(CoreError::Storage(_))
        ));
        // The session survives for a retried complete after a real upload
        let session = h.db.find_session(&init.upload_id).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Pending);
    }

    #[tokio::test]
    async fn test_pin_success_records_cid() {
        let h = harness_with(Some(Arc::new(StubReplica)), IngestConfig::default()).await;

        let init = h.service.init(init_request("e.pdf")).await.unwrap();
        upload(&h, &init, b"hello world!").await;
        let done = h.service.complete(&init.upload_id).await.unwrap();

        assert_eq!(done.cid_v1.as_deref(), Some("bafytestcid"));
        let artifact = h.db.find_artifact(&done.artifact_id).await.unwrap().unwrap();
        assert_eq!(artifact.cid_v1.as_deref(), Some("bafytestcid"));
    }

    #[tokio::test]
    async fn test_pin_failure_does_not_fail_complete() {
        let h = harness_with(Some(Arc::new(FailingReplica)), IngestConfig::default()).await;

        let init = h.service.init(init_request("e.pdf")).await.unwrap();
        upload(&h, &init, b"hello world!").await;
        let done = h.service.complete(&init.upload_id).await.unwrap();

        assert_eq!(done.sha256_hex, HELLO_DIGEST);
        assert_eq!(done.cid_v1, None);

        let session = h.db.find_session(&init.upload_id).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Complete);
    }

    #[tokio::test]
    async fn test_dedup_does_not_repin() {
        let h = harness_with(Some(Arc::new(FailingReplica)), IngestConfig::default()).await;

        let first = h.service.init(init_request("e.pdf")).await.unwrap();
        upload(&h, &first, b"hello world!").await;
        h.service.complete(&first.upload_id).await.unwrap();

        // A dedup hit never reaches the replica, so the failing backend
        // cannot be observed here.
        let second = h.service.init(init_request("copy.pdf")).await.unwrap();
        upload(&h, &second, b"hello world!").await;
        let done = h.service.complete(&second.upload_id).await.unwrap();
        assert_eq!(done.cid_v1, None);
    }
}
