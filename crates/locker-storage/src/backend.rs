//! Storage backend trait

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::time::Duration;

use crate::error::StorageError;

/// Type alias for a boxed stream of bytes
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Operation a presigned URL grants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresignOperation {
    Get,
    Put,
}

/// Storage backend trait
///
/// Implementations provide blob storage addressed by opaque bucket keys.
/// Streams are read once; every opened stream must be drained or dropped
/// on all exit paths.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write an object from a stream
    async fn put(
        &self,
        key: &str,
        stream: ByteStream,
        content_type: &str,
        content_length: Option<u64>,
    ) -> Result<(), StorageError>;

    /// Open a read-once stream over an object.
    /// `NotFound` is distinguished from other failures.
    async fn get(&self, key: &str) -> Result<ByteStream, StorageError>;

    /// Check existence without transferring the body
    async fn head(&self, key: &str) -> Result<bool, StorageError>;

    /// Delete an object. Idempotent: an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Copy an object to another key within the same store
    async fn copy(&self, from: &str, to: &str) -> Result<(), StorageError>;

    /// Produce a URL a client can use directly for the given operation
    async fn presign(
        &self,
        operation: PresignOperation,
        key: &str,
        ttl: Duration,
    ) -> Result<String, StorageError>;
}
