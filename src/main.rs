use std::process;

use clap::Parser;
use reqwest::Url;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Unix timestamp (seconds) to find the preceding block for
    #[arg(allow_negative_numbers = true)]
    timestamp: i64,

    /// Block API base URL (overrides BLOCK_API_ENDPOINT)
    #[arg(long)]
    endpoint: Option<Url>,

    /// Log every request and block time
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let options = blockfind::Options {
        endpoint: args.endpoint,
        verbose: args.verbose,
    };

    match blockfind::run(args.timestamp, options).await {
        Ok(height) => println!("{}", height),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
