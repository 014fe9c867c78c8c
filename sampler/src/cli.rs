use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    /// Print a table per snapshot
    Console,
    /// Persist to the snapshot database
    Store,
    /// Append JSON lines to a file
    Jsonl,
}

/// Samples a P2P order book on fixed clock marks and records summary statistics.
#[derive(Debug, Parser)]
#[command(name = "p2p-sampler", version)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the sampling scheduler (default)
    Run(RunArgs),

    /// Summarize stored snapshots by hour of day and weekday
    Report(ReportArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Where each snapshot goes (comma-separated)
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = [SinkKind::Console, SinkKind::Store]
    )]
    pub sinks: Vec<SinkKind>,

    /// Output file for the jsonl sink
    #[arg(long, default_value = "log/snapshots.jsonl")]
    pub jsonl_path: PathBuf,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            sinks: vec![SinkKind::Console, SinkKind::Store],
            jsonl_path: PathBuf::from("log/snapshots.jsonl"),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ReportArgs {
    /// How many days of history to include
    #[arg(long, default_value = "7", value_parser = clap::value_parser!(i64).range(1..=366))]
    pub days: i64,

    /// Local UTC offset (hours) used for hour-of-day and weekday grouping
    #[arg(long, default_value = "-4", allow_hyphen_values = true, value_parser = clap::value_parser!(i32).range(-12..=14))]
    pub utc_offset_hours: i32,
}
