//! S3-compatible storage backend
//!
//! Uses the `object_store` crate to provide S3-compatible storage for
//! the evidence locker. Supports AWS S3, MinIO, and other S3-compatible
//! services; presigned URLs are produced with SigV4 via the AWS signer.

use async_trait::async_trait;
use futures::StreamExt;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::signer::Signer;
use object_store::{Attribute, ObjectStore, PutMultipartOpts, PutPayload};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::backend::{ByteStream, PresignOperation, StorageBackend};
use crate::error::StorageError;

/// S3 storage configuration
#[derive(Debug, Clone)]
pub struct S3Config {
    /// S3 bucket name
    pub bucket: String,
    /// S3 region (e.g., "us-east-1")
    pub region: String,
    /// S3 endpoint URL (for MinIO or other S3-compatible services)
    pub endpoint: Option<String>,
    /// AWS access key ID
    pub access_key_id: Option<String>,
    /// AWS secret access key
    pub secret_access_key: Option<String>,
    /// Use path-style addressing instead of virtual-hosted
    pub force_path_style: bool,
    /// Allow HTTP (not HTTPS) connections
    pub allow_http: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: "evidence-locker".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: true,
            allow_http: false,
        }
    }
}

/// S3 storage backend
pub struct S3Storage {
    store: Arc<AmazonS3>,
}

impl S3Storage {
    /// Create a new S3 storage backend
    pub fn new(config: S3Config) -> Result<Self, StorageError> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .with_virtual_hosted_style_request(!config.force_path_style);

        // Set endpoint for MinIO or other S3-compatible services
        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }

        // Set credentials
        if let Some(access_key) = &config.access_key_id {
            builder = builder.with_access_key_id(access_key);
        }
        if let Some(secret_key) = &config.secret_access_key {
            builder = builder.with_secret_access_key(secret_key);
        }

        // Allow HTTP for local development (MinIO)
        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder.build().map_err(|e| {
            StorageError::Configuration(format!("Failed to create S3 client: {}", e))
        })?;

        info!(
            "Initialized S3 storage: bucket={}, region={}, endpoint={:?}",
            config.bucket, config.region, config.endpoint
        );

        Ok(Self {
            store: Arc::new(store),
        })
    }

    fn object_path(key: &str) -> Result<ObjectPath, StorageError> {
        ObjectPath::parse(key).map_err(|e| StorageError::InvalidKey(format!("{}: {}", key, e)))
    }
}

#[async_trait]
impl StorageBackend for S3Storage {
    async fn put(
        &self,
        key: &str,
        mut stream: ByteStream,
        content_type: &str,
        _content_length: Option<u64>,
    ) -> Result<(), StorageError> {
        let path = Self::object_path(key)?;
        debug!("Writing object to S3: {:?}", path);

        let mut opts = PutMultipartOpts::default();
        opts.attributes
            .insert(Attribute::ContentType, content_type.to_string().into());

        // Use S3 multipart upload to avoid buffering the entire object in memory
        let mut upload = self
            .store
            .put_multipart_opts(&path, opts)
            .await
            .map_err(|e| StorageError::S3(format!("Failed to start multipart upload: {}", e)))?;

        // 5MB minimum part size for S3; the last part can be smaller
        let mut buffer = Vec::with_capacity(5 * 1024 * 1024);

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    if let Err(abort) = upload.abort().await {
                        warn!("Failed to abort multipart upload for {:?}: {}", path, abort);
                    }
                    return Err(e);
                }
            };
            buffer.extend_from_slice(&chunk);

            if buffer.len() >= 5 * 1024 * 1024 {
                let part = PutPayload::from(bytes::Bytes::from(std::mem::take(&mut buffer)));
                if let Err(e) = upload.put_part(part).await {
                    if let Err(abort) = upload.abort().await {
                        warn!("Failed to abort multipart upload for {:?}: {}", path, abort);
                    }
                    return Err(StorageError::S3(format!("Failed to upload part: {}", e)));
                }
                buffer = Vec::with_capacity(5 * 1024 * 1024);
            }
        }

        if !buffer.is_empty() {
            let part = PutPayload::from(bytes::Bytes::from(buffer));
            if let Err(e) = upload.put_part(part).await {
                if let Err(abort) = upload.abort().await {
                    warn!("Failed to abort multipart upload for {:?}: {}", path, abort);
                }
                return Err(StorageError::S3(format!("Failed to upload final part: {}", e)));
            }
        }

        upload
            .complete()
            .await
            .map_err(|e| StorageError::S3(format!("Failed to complete multipart upload: {}", e)))?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<ByteStream, StorageError> {
        let path = Self::object_path(key)?;
        debug!("Streaming object from S3: {:?}", path);

        let result = self.store.get(&path).await.map_err(|e| match e {
            object_store::Error::NotFound { .. } => StorageError::NotFound(key.to_string()),
            _ => StorageError::S3(e.to_string()),
        })?;

        let stream = result
            .into_stream()
            .map(|chunk| chunk.map_err(|e| StorageError::S3(format!("Stream error: {}", e))));

        Ok(Box::pin(stream))
    }

    async fn head(&self, key: &str) -> Result<bool, StorageError> {
        let path = Self::object_path(key)?;

        match self.store.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::S3(e.to_string())),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = Self::object_path(key)?;
        debug!("Deleting object from S3: {:?}", path);

        match self.store.delete(&path).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(StorageError::S3(e.to_string())),
        }
    }

    async fn copy(&self, from: &str, to: &str) -> Result<(), StorageError> {
        let from_path = Self::object_path(from)?;
        let to_path = Self::object_path(to)?;
        debug!("Copying S3 object {:?} -> {:?}", from_path, to_path);

        self.store.copy(&from_path, &to_path).await.map_err(|e| match e {
            object_store::Error::NotFound { .. } => StorageError::NotFound(from.to_string()),
            _ => StorageError::S3(e.to_string()),
        })
    }

    async fn presign(
        &self,
        operation: PresignOperation,
        key: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        let path = Self::object_path(key)?;
        let method = match operation {
            PresignOperation::Get => Method::GET,
            PresignOperation::Put => Method::PUT,
        };

        let url = self
            .store
            .signed_url(method, &path, ttl)
            .await
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_path_roundtrip() {
        let path = S3Storage::object_path("sha256/75/09/abc/e.pdf").unwrap();
        assert_eq!(path.to_string(), "sha256/75/09/abc/e.pdf");
    }
}
