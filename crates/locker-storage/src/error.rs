//! Storage error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Presign error: {0}")]
    Presign(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}
