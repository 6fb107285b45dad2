//! CLI module
//!
//! Command-line interface for replaying pagination fixtures.
//!
//! # Commands
//!
//! - `replay` - Drive a pager over a fixture and print the aggregate
//! - `validate` - Check that a fixture parses and is consistent

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat, ReplayMode};
pub use runner::Runner;
