//! Evidence Locker - content-addressed evidence storage service

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use config::{Args, Config, ReplicaDriver, StorageDriver};
use locker_api::{AppState, MetricsHandle, create_router};
use locker_auth::{Authenticator, BearerVerifier, HmacVerifier, UploadTokenSigner};
use locker_core::{AdminService, IngestConfig, IngestService, RetrievalService};
use locker_db::Database;
use locker_ipfs::{KuboClient, PinningServiceClient, ReplicaBackend};
use locker_storage::{LocalStorage, S3Storage, StorageBackend};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_args(args).context("configuration rejected")?;

    init_logging(&config.log_level);

    info!("Starting Evidence Locker v{}", env!("CARGO_PKG_VERSION"));

    // Initialize catalog
    let db = Database::new(&config.database_url).await?;

    // Initialize object store backend
    let storage: Arc<dyn StorageBackend> = match &config.storage {
        StorageDriver::S3(s3_config) => {
            info!("Using S3 storage backend: bucket={}", s3_config.bucket);
            Arc::new(S3Storage::new(s3_config.clone())?)
        }
        StorageDriver::Local { path } => {
            info!("Using local storage backend: path={}", path);
            Arc::new(LocalStorage::new(path).await?)
        }
    };

    // Initialize optional secondary replica
    let replica: Option<Arc<dyn ReplicaBackend>> = match &config.replica {
        ReplicaDriver::SelfHosted(kubo) => {
            info!("Secondary replica: self-hosted node at {}", kubo.api_url);
            Some(Arc::new(KuboClient::new(kubo.clone())?))
        }
        ReplicaDriver::ThirdParty(pinning) => {
            info!("Secondary replica: pinning service at {}", pinning.api_url);
            Some(Arc::new(PinningServiceClient::new(pinning.clone())?))
        }
        ReplicaDriver::None => {
            info!("Secondary replica disabled");
            None
        }
    };

    // Upload tokens sign with the shared JWT secret; without one, a
    // process-random secret keeps verification meaningful for this
    // process's lifetime.
    let upload_token_secret = config.jwt_secret.clone().unwrap_or_else(|| {
        warn!("JWT_SECRET not set; upload tokens will not survive a restart");
        uuid::Uuid::new_v4().to_string()
    });
    let upload_tokens = UploadTokenSigner::new(&upload_token_secret);

    // Core services
    let ingest = Arc::new(IngestService::new(
        db.clone(),
        storage.clone(),
        replica.clone(),
        upload_tokens.clone(),
        IngestConfig {
            max_upload_bytes: config.max_upload_bytes,
            ..Default::default()
        },
    ));
    let retrieval = Arc::new(RetrievalService::new(
        db.clone(),
        storage.clone(),
        Duration::from_secs(300),
    ));
    let admin = Arc::new(AdminService::new(db.clone(), storage.clone(), replica));

    // Authentication
    let bearer = config
        .jwt_secret
        .as_deref()
        .map(|secret| BearerVerifier::new(secret, &config.jwt_audience));
    let authenticator = Arc::new(Authenticator::new(
        HmacVerifier::new(config.hmac_app_keys.clone()),
        bearer,
    ));

    let state = AppState::new(
        db,
        ingest,
        retrieval,
        admin,
        authenticator,
        upload_tokens,
        config.public_read,
    );

    // Initialize Prometheus metrics
    let metrics_handle = init_metrics();

    let mut app = create_router(state, metrics_handle.map(Arc::new))
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = cors_layer(&config.cors_allowlist) {
        app = app.layer(cors);
    }

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Initialize logging
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

/// Build the CORS layer from the configured allowlist
fn cors_layer(allowlist: &[String]) -> Option<tower_http::cors::CorsLayer> {
    use axum::http::HeaderValue;
    use tower_http::cors::{AllowOrigin, Any, CorsLayer};

    if allowlist.is_empty() {
        return None;
    }

    let origins: Vec<HeaderValue> = allowlist
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

/// Initialize Prometheus metrics
fn init_metrics() -> Option<MetricsHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            info!("Prometheus metrics enabled at /metrics");

            metrics::describe_counter!(
                "evidence_upload_init_total",
                "Upload sessions initialized"
            );
            metrics::describe_counter!(
                "evidence_upload_complete_total",
                "Upload sessions completed"
            );
            metrics::describe_counter!(
                "evidence_upload_failures_total",
                "Uploads failed at the complete phase"
            );
            metrics::describe_counter!(
                "evidence_dedup_total",
                "Completes deduplicated onto an existing artifact"
            );
            metrics::describe_counter!(
                "evidence_pin_failures_total",
                "Secondary replica pin failures"
            );
            metrics::describe_counter!(
                "evidence_download_total",
                "Presigned downloads issued"
            );
            metrics::describe_histogram!(
                "evidence_hash_duration_seconds",
                "Time spent streaming objects through the digest engine"
            );

            Some(handle)
        }
        Err(e) => {
            tracing::warn!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Shutdown signal received");
}
