//! Evidence Locker Core Business Logic
//!
//! This crate provides the ingestion and integrity pipeline for the
//! evidence locker: streaming digest computation, deterministic key
//! derivation, the two-phase upload state machine, retrieval, and the
//! administrative lifecycle.

pub mod admin;
pub mod digest;
pub mod error;
pub mod ingest;
pub mod keys;
pub mod mime;
pub mod retrieve;

pub use admin::{AdminService, PinSummary, RescanSummary, SweepOutcome};
pub use digest::{DigestOutput, hash_buffer, hash_stream, is_valid_digest, normalize_digest};
pub use error::CoreError;
pub use ingest::{ArtifactDescriptor, IngestConfig, IngestService, InitRequest, InitResponse};
pub use keys::{bucket_key, sanitize_filename};
pub use retrieve::{RetrievalService, VerifyOutcome};
