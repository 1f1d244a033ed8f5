//! Application state

use locker_auth::{Authenticator, UploadTokenSigner};
use locker_core::{AdminService, IngestService, RetrievalService};
use locker_db::Database;
use std::sync::Arc;

/// Type alias for the Prometheus metrics handle
pub type MetricsHandle = metrics_exporter_prometheus::PrometheusHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub ingest: Arc<IngestService>,
    pub retrieval: Arc<RetrievalService>,
    pub admin: Arc<AdminService>,
    pub authenticator: Arc<Authenticator>,
    pub upload_tokens: UploadTokenSigner,
    /// When set, artifact downloads skip authentication
    pub public_read: bool,
}

impl AppState {
    pub fn new(
        db: Database,
        ingest: Arc<IngestService>,
        retrieval: Arc<RetrievalService>,
        admin: Arc<AdminService>,
        authenticator: Arc<Authenticator>,
        upload_tokens: UploadTokenSigner,
        public_read: bool,
    ) -> Self {
        Self {
            db,
            ingest,
            retrieval,
            admin,
            authenticator,
            upload_tokens,
            public_read,
        }
    }
}
