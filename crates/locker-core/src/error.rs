//! Core error taxonomy
//!
//! One variant per error kind; the HTTP mapping lives in the API crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Digest mismatch: declared {declared}, actual {actual}")]
    HashMismatch { declared: String, actual: String },

    #[error("Upload session aborted")]
    SessionAborted,

    #[error("Upload session expired")]
    SessionExpired,

    #[error("File too large: {size_bytes} bytes exceeds limit of {max_bytes}")]
    FileTooLarge { size_bytes: u64, max_bytes: u64 },

    #[error("Unsupported MIME type: {0}")]
    UnsupportedMime(String),

    #[error("Secondary replica not configured")]
    ReplicaUnavailable,

    #[error("Stored bytes do not match catalog digest: expected {expected}, actual {actual}")]
    Corruption { expected: String, actual: String },

    #[error("Database error: {0}")]
    Database(#[from] locker_db::DbError),

    #[error("Storage error: {0}")]
    Storage(#[from] locker_storage::StorageError),

    #[error("Replica error: {0}")]
    Ipfs(#[from] locker_ipfs::IpfsError),

    #[error("Internal error: {0}")]
    Internal(String),
}
