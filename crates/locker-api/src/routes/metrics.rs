//! Prometheus metrics endpoint

use axum::{Router, response::IntoResponse, routing::get};
use std::sync::Arc;

use crate::state::{AppState, MetricsHandle};

/// Create metrics routes with the Prometheus handle
pub fn routes(handle: Arc<MetricsHandle>) -> Router<AppState> {
    Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render().into_response() }
        }),
    )
}
