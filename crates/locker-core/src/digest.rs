//! Streaming digest engine
//!
//! Computes the lowercase 64-hex SHA-256 and byte count of a blob by
//! consuming a stream exactly once. The full file is never buffered;
//! retry on I/O errors is the controller's job, not the engine's.

use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::time::Instant;

use locker_storage::{ByteStream, StorageError};

/// Digest and byte count observed over a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestOutput {
    /// Lowercase 64-hex SHA-256
    pub digest: String,
    pub size_bytes: u64,
}

/// Consume a stream once, producing its digest and total byte count.
/// Partial state is discarded when the reader errors.
pub async fn hash_stream(mut stream: ByteStream) -> Result<DigestOutput, StorageError> {
    let start = Instant::now();
    let mut hasher = Sha256::new();
    let mut size_bytes: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        size_bytes += chunk.len() as u64;
        hasher.update(&chunk);
    }

    metrics::histogram!("evidence_hash_duration_seconds").record(start.elapsed().as_secs_f64());

    Ok(DigestOutput {
        digest: hex::encode(hasher.finalize()),
        size_bytes,
    })
}

/// Convenience for in-memory payloads
pub fn hash_buffer(bytes: &[u8]) -> DigestOutput {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    DigestOutput {
        digest: hex::encode(hasher.finalize()),
        size_bytes: bytes.len() as u64,
    }
}

/// True iff `s` is a lowercase 64-hex SHA-256 digest
pub fn is_valid_digest(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Strip a leading `0x` / `0X` and lowercase
pub fn normalize_digest(s: &str) -> String {
    let stripped = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    stripped.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;

    const HELLO_DIGEST: &str = "7509e5bda0c762d2bac7f90d758b5b2263fa01ccbc542ab5e3df163be08e6ca9";

    fn byte_stream(chunks: Vec<&'static [u8]>) -> ByteStream {
        Box::pin(stream::iter(
            chunks.into_iter().map(|c| Ok(Bytes::from_static(c))),
        ))
    }

    #[tokio::test]
    async fn test_hash_stream_known_vector() {
        let out = hash_stream(byte_stream(vec![b"hello ", b"world!"])).await.unwrap();
        assert_eq!(out.digest, HELLO_DIGEST);
        assert_eq!(out.size_bytes, 12);
    }

    #[tokio::test]
    async fn test_hash_stream_empty() {
        let out = hash_stream(byte_stream(vec![])).await.unwrap();
        assert_eq!(
            out.digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(out.size_bytes, 0);
    }

    #[tokio::test]
    async fn test_hash_stream_propagates_reader_error() {
        let failing: ByteStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(StorageError::Backend("connection reset".to_string())),
        ]));
        assert!(hash_stream(failing).await.is_err());
    }

    #[test]
    fn test_hash_buffer_matches_stream() {
        let out = hash_buffer(b"hello world!");
        assert_eq!(out.digest, HELLO_DIGEST);
        assert_eq!(out.size_bytes, 12);
    }

    #[test]
    fn test_is_valid_digest() {
        assert!(is_valid_digest(HELLO_DIGEST));
        assert!(!is_valid_digest(&HELLO_DIGEST[..63]));
        assert!(!is_valid_digest(&HELLO_DIGEST.to_uppercase()));
        assert!(!is_valid_digest("zz09e5bda0c762d2bac7f90d758b5b2263fa01ccbc542ab5e3df163be08e6ca9"));
        assert!(!is_valid_digest(""));
    }

    #[test]
    fn test_normalize_digest() {
        assert_eq!(normalize_digest("0xABCDEF"), "abcdef");
        assert_eq!(normalize_digest("0Xabc"), "abc");
        assert_eq!(normalize_digest("AbC"), "abc");
        assert_eq!(normalize_digest(HELLO_DIGEST), HELLO_DIGEST);
    }
}
