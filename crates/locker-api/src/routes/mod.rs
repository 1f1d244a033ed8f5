//! API routes

mod admin;
mod artifacts;
mod health;
mod metrics;
mod upload;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;

use crate::state::{AppState, MetricsHandle};

/// Create the main router
pub fn create_router(state: AppState, metrics_handle: Option<Arc<MetricsHandle>>) -> Router {
    let upload_routes = Router::new()
        .route("/v1/upload/init", post(upload::init))
        .route("/v1/upload/complete", post(upload::complete))
        .route_layer(middleware::from_fn(locker_auth::require_auth));

    let admin_routes = Router::new()
        .route("/v1/admin/retention/sweep", post(admin::retention_sweep))
        .route("/v1/admin/ipfs/pin", post(admin::ipfs_pin))
        .route("/v1/admin/ipfs/unpin", post(admin::ipfs_unpin))
        .route("/v1/admin/rescan", post(admin::rescan))
        .route_layer(middleware::from_fn(locker_auth::require_admin));

    let meta_routes = Router::new()
        .route("/v1/artifacts/{digest}/meta", get(artifacts::metadata))
        .route_layer(middleware::from_fn(locker_auth::require_auth));

    // Download enforces auth per the public-read flag; verify is open
    let open_routes = Router::new()
        .route("/v1/artifacts/{digest}", get(artifacts::download))
        .route("/v1/artifacts/{digest}/verify", get(artifacts::verify));

    let api = Router::new()
        .merge(upload_routes)
        .merge(admin_routes)
        .merge(meta_routes)
        .merge(open_routes)
        .layer(middleware::from_fn_with_state(
            state.authenticator.clone(),
            locker_auth::authenticate,
        ));

    let mut router = Router::new().merge(api).merge(health::routes());
    if let Some(handle) = metrics_handle {
        router = router.merge(metrics::routes(handle));
    }
    router.with_state(state)
}
