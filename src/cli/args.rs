//! CLI argument definitions using clap
//!
//! Commands:
//! - peds compile [--config <path>]
//! - peds windows --limit <n> [--offset <n>] [--config <path>]
//! - peds fields

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// peds - Compile and page application search queries
#[derive(Parser, Debug)]
#[command(name = "peds")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a filter read from stdin into a backend request
    Compile {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the fetch windows for a limit and offset
    Windows {
        /// Maximum number of records
        #[arg(long)]
        limit: u64,

        /// Records to skip
        #[arg(long, default_value_t = 0)]
        offset: u64,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List every accepted filter name
    Fields,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
