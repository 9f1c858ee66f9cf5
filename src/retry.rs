use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use log::warn;
use tokio::time::sleep;

use crate::config::Config;
use crate::source::{Block, BlockSource, SourceError};

/// Wraps a [`BlockSource`] and retries transport failures with exponential
/// backoff. `NotFound` is passed through untouched.
pub struct Retry<S> {
    inner: S,
    max_retries: u32,
    base_delay: Duration,
}

impl<S: BlockSource> Retry<S> {
    pub fn new(inner: S, max_retries: u32, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
        }
    }

    pub fn from_config(inner: S, config: &Config) -> Self {
        Self::new(
            inner,
            config.max_retries,
            Duration::from_millis(config.retry_base_delay_ms),
        )
    }

    fn backoff(&self, retries: u32) -> Duration {
        // 1x, 2x, 4x, ... saturating at Duration::MAX
        self.base_delay
            .checked_mul(1_u32 << (retries - 1).min(16))
            .unwrap_or(Duration::MAX)
    }

    async fn with_retries<F, Fut>(&self, what: &str, mut call: F) -> Result<Block, SourceError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<Block, SourceError>> + Send,
    {
        let mut retries = 0;

        loop {
            match call().await {
                Ok(block) => return Ok(block),
                Err(e) if e.is_transport() && retries < self.max_retries => {
                    retries += 1;
                    warn!("{} failed: {} (try: {})", what, e, retries);
                    sleep(self.backoff(retries)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl<S: BlockSource> BlockSource for Retry<S> {
    async fn block_at_height(&self, height: u64) -> Result<Block, SourceError> {
        let inner = &self.inner;
        let what = format!("block {}", height);
        self.with_retries(&what, move || inner.block_at_height(height))
            .await
    }

    async fn latest_block(&self) -> Result<Block, SourceError> {
        let inner = &self.inner;
        self.with_retries("latest block", move || inner.latest_block())
            .await
    }
}
