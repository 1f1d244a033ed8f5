//! Evidence Locker Secondary Replica Layer
//!
//! This crate provides the content-addressed network port for the
//! evidence locker. Pinning is strictly best-effort from the ingestion
//! pipeline's point of view: the catalog must function when no replica
//! backend is configured at all.

pub mod backend;
pub mod error;
pub mod kubo;
pub mod pinning;

pub use backend::{PinOutcome, ReplicaBackend, ReplicaStream};
pub use error::IpfsError;
pub use kubo::{KuboClient, KuboConfig};
pub use pinning::{PinningServiceClient, PinningServiceConfig};
