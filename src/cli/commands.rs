//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Query pager fixture runner
#[derive(Parser, Debug)]
#[command(name = "query-pager")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive a pager over a fixture and print the aggregate
    Replay {
        /// Fixture file (YAML)
        fixture: PathBuf,

        /// Which pages to load
        #[arg(short, long, default_value = "all")]
        mode: ReplayMode,

        /// Maximum follow-up pages to load
        #[arg(long)]
        max_pages: Option<usize>,

        /// Print every update as it is delivered
        #[arg(long)]
        updates: bool,
    },

    /// Validate a fixture file
    Validate {
        /// Fixture file (YAML)
        fixture: PathBuf,
    },
}

/// Pages loaded by `replay`
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReplayMode {
    /// Initial page, then forward, then backward
    All,
    /// Initial page, then forward only
    Forward,
    /// Initial page, then backward only
    Backward,
    /// Initial page only
    Initial,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
