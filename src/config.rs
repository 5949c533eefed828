use clap::Parser;
use std::{
    path::PathBuf,
    time::Duration,
};

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_LOG_DIR: &str = "~/.clicker/logs";

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Terminal client for the clicker game backend", long_about = None)]
pub struct Args {
    /// Base URL of the game API
    #[arg(long, env = "CLICKER_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Period between two authoritative state fetches, in milliseconds
    #[arg(
        long,
        default_value_t = 500,
        value_parser = clap::value_parser!(u64).range(50..)
    )]
    pub poll_interval_ms: u64,

    /// Per-request timeout, in milliseconds
    #[arg(
        long,
        default_value_t = 5_000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub request_timeout_ms: u64,

    /// Directory for the rolling log file
    #[arg(long, default_value = DEFAULT_LOG_DIR)]
    pub log_dir: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub api_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub log_dir: PathBuf,
}

impl From<Args> for AppConfig {
    fn from(args: Args) -> Self {
        let log_dir = shellexpand::tilde(&args.log_dir).into_owned();
        Self {
            api_url: args.api_url,
            poll_interval: Duration::from_millis(args.poll_interval_ms),
            request_timeout: Duration::from_millis(args.request_timeout_ms),
            log_dir: PathBuf::from(log_dir),
        }
    }
}
