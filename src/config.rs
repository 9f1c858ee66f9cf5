use std::env;
use std::error::Error;
use std::fs;
use std::str::FromStr;

use log::LevelFilter;
use reqwest::Url;

const DEFAULT_API_ENDPOINT: &str = "https://blockchain.info";

#[derive(Clone, Debug)]
pub struct Config {
    pub api_endpoint: Url,
    pub request_timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub log_level: LevelFilter,
    pub log_file: Option<String>,
}

impl Config {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unparseable numbers fall back to
    /// their defaults; a bad endpoint URL is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_endpoint = lookup("BLOCK_API_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string());
        let api_endpoint = Url::parse(&api_endpoint)?;
        let request_timeout_seconds = parse_or(&lookup, "REQUEST_TIMEOUT_SECONDS", 30);
        let max_retries = parse_or(&lookup, "MAX_RETRIES", 3);
        let retry_base_delay_ms = parse_or(&lookup, "RETRY_BASE_DELAY_MS", 1000);
        let log_level = parse_or(&lookup, "LOG_LEVEL", LevelFilter::Info);
        let log_file = lookup("LOG_FILE").filter(|path| !path.is_empty());

        Ok(Self {
            api_endpoint,
            request_timeout_seconds,
            max_retries,
            retry_base_delay_ms,
            log_level,
            log_file,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Logs go to stderr, and to `log_file` as well when one is set. Stdout only
/// ever carries the result.
pub fn setup_logging(level: LevelFilter, log_file: Option<&str>) -> Result<(), fern::InitError> {
    let mut logger = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    if let Some(path) = log_file {
        logger = logger.chain(fs::File::create(path)?);
    }

    logger.apply()?;
    Ok(())
}
