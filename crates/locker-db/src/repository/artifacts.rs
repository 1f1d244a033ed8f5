//! Artifact catalog operations

use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::error::DbError;
use crate::models::{Artifact, NewArtifact, ScanStatus};
use crate::repository::Database;

impl Database {
    /// Insert an artifact unless one with the same digest already exists.
    ///
    /// Atomic: two concurrent calls for the same digest yield exactly one
    /// insert. Returns the winning row and whether this call created it.
    pub async fn create_artifact_if_absent(
        &self,
        artifact: NewArtifact,
    ) -> Result<(Artifact, bool), DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO artifacts (id, digest, size_bytes, mime, filename, bucket_key,
                                   uploader_org_id, project_id, issuance_id, meta_json,
                                   verified_at, scan_status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'PENDING', ?)
            ON CONFLICT(digest) DO NOTHING
            "#,
        )
        .bind(&artifact.id)
        .bind(&artifact.digest)
        .bind(artifact.size_bytes)
        .bind(&artifact.mime)
        .bind(&artifact.filename)
        .bind(&artifact.bucket_key)
        .bind(&artifact.uploader_org_id)
        .bind(&artifact.project_id)
        .bind(&artifact.issuance_id)
        .bind(&artifact.meta_json)
        .bind(artifact.verified_at.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() > 0;

        // Either our row or the concurrent winner's row.
        let winner = self
            .find_artifact_by_digest(&artifact.digest)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("artifact digest {}", artifact.digest)))?;

        Ok((winner, created))
    }

    /// Get an artifact by digest
    pub async fn find_artifact_by_digest(&self, digest: &str) -> Result<Option<Artifact>, DbError> {
        let result = sqlx::query(
            r#"
            SELECT id, digest, size_bytes, mime, filename, bucket_key, cid_v1,
                   uploader_org_id, project_id, issuance_id, meta_json,
                   verified_at, scan_status, created_at
            FROM artifacts
            WHERE digest = ?
            "#,
        )
        .bind(digest)
        .fetch_optional(&self.pool)
        .await?;

        result
            .map(|row| Artifact::try_from(&row).map_err(DbError::from))
            .transpose()
    }

    /// Get an artifact by id
    pub async fn find_artifact(&self, id: &str) -> Result<Option<Artifact>, DbError> {
        let result = sqlx::query(
            r#"
            SELECT id, digest, size_bytes, mime, filename, bucket_key, cid_v1,
                   uploader_org_id, project_id, issuance_id, meta_json,
                   verified_at, scan_status, created_at
            FROM artifacts
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        result
            .map(|row| Artifact::try_from(&row).map_err(DbError::from))
            .transpose()
    }

    /// Set or clear the secondary-network content id of an artifact
    pub async fn set_artifact_cid(&self, id: &str, cid: Option<&str>) -> Result<bool, DbError> {
        let result = sqlx::query("UPDATE artifacts SET cid_v1 = ? WHERE id = ?")
            .bind(cid)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record the outcome of a scan pass
    pub async fn set_artifact_scan_status(
        &self,
        id: &str,
        status: ScanStatus,
        verified_at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let result = sqlx::query("UPDATE artifacts SET scan_status = ?, verified_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(verified_at.to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List artifacts created strictly before the cutoff, oldest first
    pub async fn list_artifacts_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Artifact>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT id, digest, size_bytes, mime, filename, bucket_key, cid_v1,
                   uploader_org_id, project_id, issuance_id, meta_json,
                   verified_at, scan_status, created_at
            FROM artifacts
            WHERE created_at < ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(cutoff.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Artifact::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Delete an artifact by id
    pub async fn delete_artifact(&self, id: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM artifacts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Total artifact count
    pub async fn artifact_count(&self) -> Result<i64, DbError> {
        let result = sqlx::query("SELECT COUNT(*) as count FROM artifacts")
            .fetch_one(&self.pool)
            .await?;
        Ok(result.get("count"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_database;

    fn sample(id: &str, digest: &str) -> NewArtifact {
        NewArtifact {
            id: id.to_string(),
            digest: digest.to_string(),
            size_bytes: 12,
            mime: "application/pdf".to_string(),
            filename: "e.pdf".to_string(),
            bucket_key: format!("sha256/{}/{}/{}/e.pdf", &digest[..2], &digest[2..4], digest),
            uploader_org_id: Some("org-1".to_string()),
            project_id: None,
            issuance_id: None,
            meta_json: None,
            verified_at: Utc::now(),
        }
    }

    const DIGEST_A: &str = "7509e5bda0c762d2bac7f90d758b5b2263fa01ccbc542ab5e3df163be08e6ca9";
    const DIGEST_B: &str = "8f434346648f6b96df89dda901c5176b10a6d83961dd3c1ac88b59b2dc327aa4";

    #[tokio::test]
    async fn test_create_if_absent_dedups_on_digest() {
        let (db, _dir) = test_database().await;

        let (first, created) = db.create_artifact_if_absent(sample("a1", DIGEST_A)).await.unwrap();
        assert!(created);
        assert_eq!(first.id, "a1");
        assert_eq!(first.scan_status, ScanStatus::Pending);

        // Second insert with the same digest loses; the existing row wins.
        let (second, created) = db.create_artifact_if_absent(sample("a2", DIGEST_A)).await.unwrap();
        assert!(!created);
        assert_eq!(second.id, "a1");
        assert_eq!(db.artifact_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cid_and_scan_status_updates() {
        let (db, _dir) = test_database().await;
        let (artifact, _) = db.create_artifact_if_absent(sample("a1", DIGEST_A)).await.unwrap();

        assert!(db.set_artifact_cid(&artifact.id, Some("bafybeigdyr")).await.unwrap());
        let reloaded = db.find_artifact(&artifact.id).await.unwrap().unwrap();
        assert_eq!(reloaded.cid_v1.as_deref(), Some("bafybeigdyr"));

        assert!(db.set_artifact_cid(&artifact.id, None).await.unwrap());
        let reloaded = db.find_artifact(&artifact.id).await.unwrap().unwrap();
        assert_eq!(reloaded.cid_v1, None);

        let now = Utc::now();
        assert!(db.set_artifact_scan_status(&artifact.id, ScanStatus::Clean, now).await.unwrap());
        let reloaded = db.find_artifact(&artifact.id).await.unwrap().unwrap();
        assert_eq!(reloaded.scan_status, ScanStatus::Clean);
    }

    #[tokio::test]
    async fn test_list_created_before_and_delete() {
        let (db, _dir) = test_database().await;
        db.create_artifact_if_absent(sample("a1", DIGEST_A)).await.unwrap();
        db.create_artifact_if_absent(sample("a2", DIGEST_B)).await.unwrap();

        let future = Utc::now() + chrono::Duration::hours(1);
        let old = db.list_artifacts_created_before(future).await.unwrap();
        assert_eq!(old.len(), 2);

        let past = Utc::now() - chrono::Duration::hours(1);
        assert!(db.list_artifacts_created_before(past).await.unwrap().is_empty());

        assert!(db.delete_artifact("a1").await.unwrap());
        assert!(!db.delete_artifact("a1").await.unwrap());
        assert_eq!(db.artifact_count().await.unwrap(), 1);
    }
}
