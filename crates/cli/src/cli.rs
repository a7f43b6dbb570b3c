//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Tag Logger - publish monitored tag readings to metrics, HTTP, websockets and a document store
#[derive(Parser, Debug)]
#[command(
    name = "tag-logger",
    author,
    version,
    about = "Industrial tag reading dispatcher",
    long_about = "Publishes monitored tag readings to every enabled exporter.\n\n\
                  Resolves each reading against the configured tag table, derives its \n\
                  kind and numeric sample, and fans it out to the Prometheus endpoint, \n\
                  an HTTP collector, websocket subscribers and a document store."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TAG_LOGGER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TAG_LOGGER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the logger: pump readings from a source through the dispatcher
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Where readings come from
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SourceKind {
    /// Generated values for every configured tag
    #[default]
    Simulate,
    /// JSON lines recorded earlier (requires --replay)
    Replay,
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "TAG_LOGGER_CONFIG"
    )]
    pub config: PathBuf,

    /// Reading source
    #[arg(long, value_enum, default_value = "simulate", env = "TAG_LOGGER_SOURCE")]
    pub source: SourceKind,

    /// JSON lines file for the replay source
    #[arg(long, env = "TAG_LOGGER_REPLAY")]
    pub replay: Option<PathBuf>,

    /// Interval between simulated rounds, or between replayed readings (0 = no pacing)
    #[arg(long, default_value = "1000", env = "TAG_LOGGER_INTERVAL_MS")]
    pub interval_ms: u64,

    /// Maximum number of readings to process (0 = unlimited)
    #[arg(long, default_value = "0", env = "TAG_LOGGER_MAX_READINGS")]
    pub max_readings: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "TAG_LOGGER_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Channel buffer size between source and dispatcher
    #[arg(long, default_value = "256", env = "TAG_LOGGER_BUFFER_SIZE")]
    pub buffer_size: NonZeroUsize,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// List every configured tag
    #[arg(long)]
    pub tags: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
