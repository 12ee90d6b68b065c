//! CLI argument definitions using clap
//!
//! Commands:
//! - docagg run --config <path>
//! - docagg explain --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docagg - grouping aggregations over JSON document collections
#[derive(Parser, Debug)]
#[command(name = "docagg")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one aggregate request read from stdin and print its documents
    Run {
        /// Path to configuration file
        #[arg(long, default_value = "./docagg.json")]
        config: PathBuf,
    },

    /// Print the command and explain text for a request without running it
    Explain {
        /// Path to configuration file
        #[arg(long, default_value = "./docagg.json")]
        config: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
