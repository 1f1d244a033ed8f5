//! Catalog repository implementation

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbError;

mod artifacts;
mod sessions;

/// Database connection and operations
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    pub async fn new(database_url: &str) -> Result<Self, DbError> {
        info!("Connecting to database: {}", database_url);

        let pool = SqlitePool::connect(database_url).await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Get the underlying pool for advanced usage
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Liveness probe used by the health endpoint
    pub async fn ping(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<(), DbError> {
        info!("Running database migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS artifacts (
                id TEXT PRIMARY KEY,
                digest TEXT NOT NULL UNIQUE,
                size_bytes INTEGER NOT NULL,
                mime TEXT NOT NULL,
                filename TEXT NOT NULL,
                bucket_key TEXT NOT NULL,
                cid_v1 TEXT,
                uploader_org_id TEXT,
                project_id TEXT,
                issuance_id TEXT,
                meta_json TEXT,
                verified_at TEXT NOT NULL,
                scan_status TEXT NOT NULL DEFAULT 'PENDING',
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_artifacts_digest ON artifacts(digest)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_artifacts_created_at ON artifacts(created_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS upload_sessions (
                id TEXT PRIMARY KEY,
                token TEXT NOT NULL,
                declared_digest TEXT,
                filename TEXT NOT NULL,
                expected_size INTEGER,
                mime_hint TEXT,
                bucket_key TEXT NOT NULL,
                uploader_org_id TEXT,
                project_id TEXT,
                issuance_id TEXT,
                meta_json TEXT,
                status TEXT NOT NULL DEFAULT 'PENDING',
                artifact_id TEXT,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                completed_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_upload_sessions_status ON upload_sessions(status)
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Database migrations completed");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) async fn test_database() -> (Database, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("catalog.db").display());
    let db = Database::new(&url).await.expect("database");
    (db, dir)
}
