//! Third-party pinning service client
//!
//! Pins content through a hosted pinning provider authenticated with an
//! API key. The wire shapes follow the Pinata-style file pinning API.

use async_trait::async_trait;
use reqwest::{Body, Client, multipart};
use serde::Deserialize;
use tracing::{debug, info};

use crate::backend::{PinOutcome, ReplicaBackend, ReplicaStream};
use crate::error::IpfsError;

/// Pinning service configuration
#[derive(Debug, Clone)]
pub struct PinningServiceConfig {
    /// Base URL of the pinning API (e.g., "https://api.pinata.cloud")
    pub api_url: String,
    /// Bearer API key
    pub api_key: String,
    /// Public gateway base URL
    pub gateway_url: String,
}

#[derive(Debug, Deserialize)]
struct PinFileResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
    #[serde(rename = "PinSize")]
    pin_size: u64,
}

/// Hosted pinning service backend
pub struct PinningServiceClient {
    config: PinningServiceConfig,
    client: Client,
}

impl PinningServiceClient {
    /// Create a new pinning service client
    pub fn new(config: PinningServiceConfig) -> Result<Self, IpfsError> {
        if config.api_key.is_empty() {
            return Err(IpfsError::Configuration(
                "pinning service API key is empty".to_string(),
            ));
        }
        let client = Client::builder().build()?;
        info!("Created pinning service client for {}", config.api_url);
        Ok(Self { config, client })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl ReplicaBackend for PinningServiceClient {
    async fn pin(&self, stream: ReplicaStream) -> Result<PinOutcome, IpfsError> {
        let part = multipart::Part::stream(Body::wrap_stream(stream)).file_name("blob");
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.api_url("/pinning/pinFileToIPFS"))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IpfsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: PinFileResponse = response
            .json()
            .await
            .map_err(|e| IpfsError::InvalidResponse(format!("pin response: {}", e)))?;

        debug!("Pinned content via pinning service: cid={}", parsed.ipfs_hash);

        Ok(PinOutcome {
            cid: parsed.ipfs_hash,
            size: parsed.pin_size,
        })
    }

    async fn unpin(&self, cid: &str) -> Result<(), IpfsError> {
        let response = self
            .client
            .delete(self.api_url(&format!("/pinning/unpin/{}", cid)))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let status = response.status();
        // An already-unpinned CID reports 404; treat it as a no-op
        if status.as_u16() == 404 {
            debug!("Unpin of {} was a no-op", cid);
            return Ok(());
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IpfsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!("Unpinned content via pinning service: cid={}", cid);
        Ok(())
    }

    fn gateway_url(&self, cid: &str) -> String {
        format!(
            "{}/ipfs/{}",
            self.config.gateway_url.trim_end_matches('/'),
            cid
        )
    }
}
