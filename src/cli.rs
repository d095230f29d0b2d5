//! Command-line argument parsing for athena-mcp.
//!
//! AWS identity and Athena defaults come from the environment; the flags here
//! only control the server itself.

use crate::config::Config;
use crate::query::PollPolicy;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// An MCP server for querying S3 data with AWS Athena.
#[derive(Parser, Debug)]
#[command(name = "athena-mcp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", env = "ATHENA_MCP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Delay between query status checks, in milliseconds
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Status checks before a query times out
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_poll_attempts: Option<u32>,

    /// Path to the AWS CLI executable
    #[arg(long, value_name = "PATH")]
    pub aws_cli: Option<PathBuf>,

    /// Use an in-memory mock instead of AWS (for testing MCP clients)
    #[arg(long)]
    pub mock: bool,

    /// Write logs to a file instead of stderr ("-" for the default location)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Resolves the poll policy: flags override the config file.
    pub fn poll_policy(&self, config: &Config) -> PollPolicy {
        let mut policy = PollPolicy::from(&config.query);
        if let Some(ms) = self.poll_interval_ms {
            policy.interval = Duration::from_millis(ms);
        }
        if let Some(attempts) = self.max_poll_attempts {
            policy.max_attempts = attempts;
        }
        policy
    }

    /// Resolves the AWS CLI executable: the flag overrides the config file.
    pub fn aws_cli_path(&self, config: &Config) -> PathBuf {
        self.aws_cli
            .clone()
            .unwrap_or_else(|| config.aws.cli_path.clone())
    }
}
