//! Evidence Locker REST API
//!
//! This crate provides the Axum-based HTTP surface for the evidence
//! locker: the two-phase upload endpoints, artifact retrieval, the
//! admin lifecycle, and operational endpoints.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::{AppState, MetricsHandle};
