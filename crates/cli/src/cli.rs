//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Batcher Bench - load generator for the batching dispatcher
#[derive(Parser, Debug)]
#[command(
    name = "batcher-bench",
    author,
    version,
    about = "Load generator for the batching dispatcher",
    long_about = "Drives a batching dispatcher with concurrent producers.\n\n\
                  Loads a bench profile, submits items from several threads, \n\
                  waits for the dispatcher to go idle and reports batch statistics."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BATCHER_BENCH_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "BATCHER_BENCH_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default level implied by `-q` / `-v` / `-vv`
    pub fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a bench profile against a dispatcher
    Run(RunArgs),

    /// Validate a profile without running it
    Validate(ValidateArgs),

    /// Display the effective profile
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone, Default)]
pub struct RunArgs {
    /// Path to profile (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "BATCHER_BENCH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: ProfileOverrides,

    /// Give up waiting for idle after this many seconds (0 = wait forever)
    #[arg(long, default_value = "0", env = "BATCHER_BENCH_TIMEOUT")]
    pub timeout: u64,

    /// Validate and print the effective profile without running
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "BATCHER_BENCH_METRICS_PORT")]
    pub metrics_port: u16,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Command-line overrides applied on top of the profile
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ProfileOverrides {
    /// Override dispatcher capacity
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Override dispatcher delay (milliseconds)
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Override number of producer threads
    #[arg(long)]
    pub producers: Option<usize>,

    /// Override items submitted per producer
    #[arg(long)]
    pub items: Option<usize>,

    /// Override scheduling facility
    #[arg(long, value_enum)]
    pub scheduler: Option<SchedulerArg>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to profile to validate
    #[arg(short, long, default_value = "bench.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to profile; built-in defaults when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the effective profile as TOML
    #[arg(long, conflicts_with = "json")]
    pub toml: bool,
}

/// Scheduling facility selectable on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerArg {
    /// Dedicated flush thread
    Thread,
    /// Tokio runtime timers
    Tokio,
}

impl From<SchedulerArg> for contracts::SchedulerKind {
    fn from(arg: SchedulerArg) -> Self {
        match arg {
            SchedulerArg::Thread => Self::Thread,
            SchedulerArg::Tokio => Self::Tokio,
        }
    }
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
