//! CLI argument definitions using clap
//!
//! Commands:
//! - ds-repltest run --config <path> [--no-serve] [--json]
//! - ds-repltest estimate --config <path> [--json]
//! - ds-repltest check-config --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

/// ds-repltest - replication check for multi-supplier directory topologies
#[derive(Parser, Debug)]
#[command(name = "ds-repltest")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the replication check once, then serve the dashboard
    Run {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Exit after the check instead of serving the dashboard
        #[arg(long)]
        no_serve: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the watchdog estimate for a full run
    Estimate {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the configuration file and exit
    CheckConfig {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
