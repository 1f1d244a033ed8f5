//! Replica backend trait

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

use crate::error::IpfsError;

/// Type alias for a boxed stream of bytes fed to a replica backend
pub type ReplicaStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Result of pinning a blob to the content-addressed network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinOutcome {
    /// CIDv1 of the pinned content
    pub cid: String,
    /// Size reported by the replica
    pub size: u64,
}

/// Secondary-replica backend trait
///
/// The whole port is optional; callers hold `Option<Arc<dyn ReplicaBackend>>`
/// and treat an absent backend as "replication disabled".
#[async_trait]
pub trait ReplicaBackend: Send + Sync {
    /// Pin the streamed content, returning its CID
    async fn pin(&self, stream: ReplicaStream) -> Result<PinOutcome, IpfsError>;

    /// Unpin previously pinned content
    async fn unpin(&self, cid: &str) -> Result<(), IpfsError>;

    /// Public gateway URL for a CID
    fn gateway_url(&self, cid: &str) -> String;
}
