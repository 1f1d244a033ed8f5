//! Evidence Locker Storage Layer
//!
//! This crate provides the object-store port for the evidence locker,
//! supporting local disk and S3-compatible backends. Keys are opaque
//! bucket keys derived by the core; the backends never inspect them.

pub mod backend;
pub mod error;
pub mod local;
pub mod s3;

pub use backend::{ByteStream, PresignOperation, StorageBackend};
pub use error::StorageError;
pub use local::LocalStorage;
pub use s3::{S3Config, S3Storage};
