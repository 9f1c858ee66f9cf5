use chrono::DateTime;
use futures::try_join;
use log::{debug, info};
use thiserror::Error;

use crate::source::{Block, BlockSource, SourceError};

/// Bitcoin mainnet genesis block.
pub const GENESIS: Block = Block {
    height: 0,
    time: 1_231_006_505,
};

#[derive(Debug, Error)]
pub enum LocateError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("timestamp {target} is less than the genesis block timestamp {genesis}")]
    BeforeGenesis { target: i64, genesis: i64 },
    #[error("timestamp {target} is equal to the genesis block timestamp")]
    AtGenesis { target: i64 },
    #[error("failed to find block before timestamp {0}")]
    BracketNotFound(i64),
}

/// Finds the last block mined strictly before a point in time.
///
/// The search narrows a frame of two fetched blocks and compares each
/// midpoint together with its predecessor, so a single block whose timestamp
/// runs behind its parent cannot send it the wrong way. When the chain is too
/// disordered to bracket the target, [`LocateError::BracketNotFound`] is
/// returned rather than a guess.
pub struct Locator<S> {
    source: S,
    genesis: Block,
}

impl<S: BlockSource> Locator<S> {
    pub fn new(source: S) -> Self {
        Self::with_genesis(source, GENESIS)
    }

    pub fn with_genesis(source: S, genesis: Block) -> Self {
        Self { source, genesis }
    }

    /// Returns the height `h` such that `time(h) < target <= time(h + 1)`,
    /// or the tip height if `target` is past the latest block.
    pub async fn locate(&self, target: i64) -> Result<u64, LocateError> {
        if target < self.genesis.time {
            return Err(LocateError::BeforeGenesis {
                target,
                genesis: self.genesis.time,
            });
        }
        if target == self.genesis.time {
            return Err(LocateError::AtGenesis { target });
        }

        let mut start = self.genesis;
        let mut end = self.source.latest_block().await?;
        debug!("tip: {} ({})", end.height, fmt_time(end.time));

        if target > end.time {
            return Ok(end.height);
        }

        while start.height <= end.height {
            let mid_height =
                (start.height + (end.height - start.height).div_ceil(2)).min(end.height);
            let Some(before_height) = mid_height.checked_sub(1) else {
                break;
            };

            let (before, mid) = try_join!(
                self.source.block_at_height(before_height),
                self.source.block_at_height(mid_height)
            )?;
            info!(
                "s: {} ({}), m-1: {} ({}), m: {} ({}), e: {} ({})",
                start.height,
                start.time,
                before.height,
                before.time,
                mid.height,
                mid.time,
                end.height,
                end.time
            );
            debug!(
                "m-1 at {}, m at {}",
                fmt_time(before.time),
                fmt_time(mid.time)
            );

            if before.time < target {
                if target <= mid.time {
                    return Ok(before.height);
                }
                // only an inconsistent source gets here with a collapsed frame
                if mid.height == start.height {
                    break;
                }
                start = mid;
            } else {
                end = before;
            }
        }

        Err(LocateError::BracketNotFound(target))
    }
}

fn fmt_time(time: i64) -> String {
    DateTime::from_timestamp(time, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| time.to_string())
}
