use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::ContentStore;
use crate::error::{BridgeError, Result};

/// Content store backed by an IPFS node's HTTP API
#[derive(Clone)]
pub struct IpfsGateway {
    client: Client,
    api_url: String,
}

impl IpfsGateway {
    pub fn new(api_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.into(),
        })
    }
}

#[async_trait]
impl ContentStore for IpfsGateway {
    async fn cat(&self, hash: &str) -> Result<Vec<u8>> {
        let url = format!("{}/api/v0/cat", self.api_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .query(&[("arg", hash)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("IPFS cat {} failed: {} - {}", hash, status, message);
            return Err(BridgeError::Storage(format!("IPFS returned {}: {}", status, message)));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
