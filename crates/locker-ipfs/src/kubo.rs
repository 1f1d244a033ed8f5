//! Self-hosted Kubo node client
//!
//! Talks to the RPC API of a self-hosted IPFS (Kubo) node. Content is
//! added with `cid-version=1` so the stored identifier matches the
//! catalog's `cid_v1` column.

use async_trait::async_trait;
use reqwest::{Body, Client, multipart};
use serde::Deserialize;
use tracing::{debug, info};

use crate::backend::{PinOutcome, ReplicaBackend, ReplicaStream};
use crate::error::IpfsError;

/// Kubo client configuration
#[derive(Debug, Clone)]
pub struct KuboConfig {
    /// Base URL of the node's RPC API (e.g., "http://127.0.0.1:5001")
    pub api_url: String,
    /// Public gateway base URL
    pub gateway_url: String,
}

impl Default for KuboConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:5001".to_string(),
            gateway_url: "https://ipfs.io".to_string(),
        }
    }
}

/// Response from `/api/v0/add`. Kubo reports `Size` as a string.
#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
    #[serde(rename = "Size")]
    size: String,
}

/// Self-hosted IPFS node backend
pub struct KuboClient {
    config: KuboConfig,
    client: Client,
}

impl KuboClient {
    /// Create a new Kubo client
    pub fn new(config: KuboConfig) -> Result<Self, IpfsError> {
        let client = Client::builder().build()?;
        info!("Created Kubo replica client for {}", config.api_url);
        Ok(Self { config, client })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl ReplicaBackend for KuboClient {
    async fn pin(&self, stream: ReplicaStream) -> Result<PinOutcome, IpfsError> {
        let part = multipart::Part::stream(Body::wrap_stream(stream)).file_name("blob");
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.api_url("/api/v0/add?cid-version=1&pin=true"))
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

        // The add endpoint streams one JSON object per line; the last
        // line describes the root of what was added.
        let body = response.text().await?;
        let last = body
            .lines()
            .filter(|l| !l.trim().is_empty())
            .next_back()
            .ok_or_else(|| IpfsError::InvalidResponse("empty add response".to_string()))?;
        let parsed: AddResponse = serde_json::from_str(last)
            .map_err(|e| IpfsError::InvalidResponse(format!("add response: {}", e)))?;
        let size = parsed
            .size
            .parse::<u64>()
            .map_err(|e| IpfsError::InvalidResponse(format!("add size: {}", e)))?;

        debug!("Pinned content to Kubo node: cid={}", parsed.hash);

        Ok(PinOutcome {
            cid: parsed.hash,
            size,
        })
    }

    async fn unpin(&self, cid: &str) -> Result<(), IpfsError> {
        let response = self
            .client
            .post(self.api_url(&format!("/api/v0/pin/rm?arg={}", cid)))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            // Unpinning something that was never pinned is not a failure
            if message.contains("not pinned") {
                debug!("Unpin of {} was a no-op", cid);
                return Ok(());
            }
            return Err(IpfsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!("Unpinned content from Kubo node: cid={}", cid);
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
