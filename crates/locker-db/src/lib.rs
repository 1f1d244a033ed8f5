//! Evidence Locker Catalog
//!
//! This crate provides the catalog layer for the evidence locker,
//! using SQLite via sqlx for persistence. The catalog is the single
//! authority for artifact uniqueness and upload session transitions.

pub mod error;
pub mod models;
pub mod repository;
pub mod utils;

pub use error::DbError;
pub use models::*;
pub use repository::Database;

/// Re-export sqlx types for convenience
pub use sqlx::SqlitePool;
