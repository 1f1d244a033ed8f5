//! Upload session operations

use chrono::{DateTime, Utc};

use crate::error::DbError;
use crate::models::{NewUploadSession, SessionStatus, UploadSession};
use crate::repository::Database;

impl Database {
    /// Create a new upload session in PENDING state
    pub async fn create_session(&self, session: NewUploadSession) -> Result<UploadSession, DbError> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO upload_sessions (id, token, declared_digest, filename, expected_size,
                                         mime_hint, bucket_key, uploader_org_id, project_id,
                                         issuance_id, meta_json, status, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'PENDING', ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(&session.token)
        .bind(&session.declared_digest)
        .bind(&session.filename)
        .bind(session.expected_size)
        .bind(&session.mime_hint)
        .bind(&session.bucket_key)
        .bind(&session.uploader_org_id)
        .bind(&session.project_id)
        .bind(&session.issuance_id)
        .bind(&session.meta_json)
        .bind(now.to_rfc3339())
        .bind(session.expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(UploadSession {
            id: session.id,
            token: session.token,
            declared_digest: session.declared_digest,
            filename: session.filename,
            expected_size: session.expected_size,
            mime_hint: session.mime_hint,
            bucket_key: session.bucket_key,
            uploader_org_id: session.uploader_org_id,
            project_id: session.project_id,
            issuance_id: session.issuance_id,
            meta_json: session.meta_json,
            status: SessionStatus::Pending,
            artifact_id: None,
            created_at: now,
            expires_at: session.expires_at,
            completed_at: None,
        })
    }

    /// Get an upload session by id
    pub async fn find_session(&self, id: &str) -> Result<Option<UploadSession>, DbError> {
        let result = sqlx::query(
            r#"
            SELECT id, token, declared_digest, filename, expected_size, mime_hint,
                   bucket_key, uploader_org_id, project_id, issuance_id, meta_json,
                   status, artifact_id, created_at, expires_at, completed_at
            FROM upload_sessions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        result
            .map(|row| UploadSession::try_from(&row).map_err(DbError::from))
            .transpose()
    }

    /// Transition a session's status, guarded by the expected current status.
    ///
    /// Returns whether the guard won. A losing call leaves the row untouched,
    /// which keeps terminal sessions frozen.
    pub async fn update_session_status(
        &self,
        id: &str,
        status: SessionStatus,
        completed_at: Option<DateTime<Utc>>,
        artifact_id: Option<&str>,
        expected: SessionStatus,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE upload_sessions
            SET status = ?, completed_at = ?, artifact_id = COALESCE(?, artifact_id)
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(status.as_str())
        .bind(completed_at.map(|t| t.to_rfc3339()))
        .bind(artifact_id)
        .bind(id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_database;

    fn sample(id: &str) -> NewUploadSession {
        NewUploadSession {
            id: id.to_string(),
            token: "tok".to_string(),
            declared_digest: None,
            filename: "report.pdf".to_string(),
            expected_size: Some(1024),
            mime_hint: Some("application/pdf".to_string()),
            bucket_key: "sha256/ab/cd/abcd/report.pdf".to_string(),
            uploader_org_id: Some("org-1".to_string()),
            project_id: Some("proj-7".to_string()),
            issuance_id: None,
            meta_json: None,
            expires_at: Utc::now() + chrono::Duration::minutes(5),
        }
    }

    #[tokio::test]
    async fn test_create_and_find_session() {
        let (db, _dir) = test_database().await;

        let created = db.create_session(sample("u1")).await.unwrap();
        assert_eq!(created.status, SessionStatus::Pending);
        assert!(created.completed_at.is_none());

        let loaded = db.find_session("u1").await.unwrap().unwrap();
        assert_eq!(loaded.filename, "report.pdf");
        assert_eq!(loaded.expected_size, Some(1024));
        assert_eq!(loaded.artifact_id, None);
        assert!(db.find_session("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_guarded_transition_is_single_winner() {
        let (db, _dir) = test_database().await;
        db.create_session(sample("u1")).await.unwrap();

        let now = Utc::now();
        let won = db
            .update_session_status("u1", SessionStatus::Complete, Some(now), Some("a1"), SessionStatus::Pending)
            .await
            .unwrap();
        assert!(won);

        // The loser of the race observes a terminal row and cannot transition it.
        let won = db
            .update_session_status("u1", SessionStatus::Aborted, Some(now), None, SessionStatus::Pending)
            .await
            .unwrap();
        assert!(!won);

        let session = db.find_session("u1").await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Complete);
        assert_eq!(session.artifact_id.as_deref(), Some("a1"));
        assert!(session.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_artifact_id_survives_null_update() {
        let (db, _dir) = test_database().await;
        db.create_session(sample("u1")).await.unwrap();

        db.update_session_status("u1", SessionStatus::Complete, Some(Utc::now()), Some("a1"), SessionStatus::Pending)
            .await
            .unwrap();

        // COALESCE keeps the linked artifact when no new id is supplied.
        db.update_session_status("u1", SessionStatus::Complete, None, None, SessionStatus::Complete)
            .await
            .unwrap();
        let session = db.find_session("u1").await.unwrap().unwrap();
        assert_eq!(session.artifact_id.as_deref(), Some("a1"));
    }
}
