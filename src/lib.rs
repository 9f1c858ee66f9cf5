pub mod config;
pub mod locator;
pub mod retry;
pub mod source;

use std::error::Error;

use log::LevelFilter;
use reqwest::Url;

use crate::config::Config;
use crate::locator::Locator;
use crate::retry::Retry;
use crate::source::BlockchainInfo;

/// Overrides taken from the command line.
#[derive(Debug, Default)]
pub struct Options {
    pub endpoint: Option<Url>,
    pub verbose: bool,
}

pub async fn run(target: i64, options: Options) -> Result<u64, Box<dyn Error>> {
    let mut config = Config::new()?;
    if let Some(endpoint) = options.endpoint {
        config.api_endpoint = endpoint;
    }
    if options.verbose {
        config.log_level = LevelFilter::Debug;
    }

    config::setup_logging(config.log_level, config.log_file.as_deref())?;

    let source = Retry::from_config(BlockchainInfo::from_config(&config)?, &config);
    let height = Locator::new(source).locate(target).await?;

    Ok(height)
}
