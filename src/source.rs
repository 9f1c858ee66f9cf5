use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;

use crate::config::Config;

/// A chain block reduced to what the search needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub height: u64,
    /// Seconds since the Unix epoch.
    pub time: i64,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("block at height {0} not found")]
    NotFound(u64),
}

impl SourceError {
    /// Network, HTTP and decoding failures. These are the ones worth retrying.
    pub fn is_transport(&self) -> bool {
        !matches!(self, SourceError::NotFound(_))
    }
}

#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn block_at_height(&self, height: u64) -> Result<Block, SourceError>;
    async fn latest_block(&self) -> Result<Block, SourceError>;
}

#[derive(Debug, Deserialize)]
struct HeightResponse {
    blocks: Vec<ApiBlock>,
}

#[derive(Debug, Deserialize)]
struct ApiBlock {
    time: i64,
    #[serde(default)]
    main_chain: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    height: u64,
    time: i64,
}

/// Decodes a `/block-height/{h}` body. Stale blocks share a height with the
/// main chain block, so the `main_chain` one wins when the API flags it.
pub fn decode_block_at_height(height: u64, body: &str) -> Result<Block, SourceError> {
    let response: HeightResponse = serde_json::from_str(body)?;
    let block = response
        .blocks
        .iter()
        .find(|block| block.main_chain == Some(true))
        .or_else(|| response.blocks.first())
        .ok_or(SourceError::NotFound(height))?;

    Ok(Block {
        height,
        time: block.time,
    })
}

pub fn decode_latest_block(body: &str) -> Result<Block, SourceError> {
    let response: LatestResponse = serde_json::from_str(body)?;
    Ok(Block {
        height: response.height,
        time: response.time,
    })
}

/// Block source backed by the blockchain.info REST API.
#[derive(Clone)]
pub struct BlockchainInfo {
    client: Client,
    endpoint: Url,
}

impl BlockchainInfo {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        Self::new(
            config.api_endpoint.clone(),
            Duration::from_secs(config.request_timeout_seconds),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint.as_str().trim_end_matches('/'), path)
    }
}

#[async_trait]
impl BlockSource for BlockchainInfo {
    async fn block_at_height(&self, height: u64) -> Result<Block, SourceError> {
        let url = self.url(&format!("block-height/{}?format=json", height));
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(height));
        }
        let body = response.error_for_status()?.text().await?;

        decode_block_at_height(height, &body)
    }

    async fn latest_block(&self) -> Result<Block, SourceError> {
        let url = self.url("latestblock");
        debug!("GET {}", url);

        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        decode_latest_block(&body)
    }
}
