//! CLI module for ds-repltest
//!
//! Provides command-line interface for:
//! - run: Check replication once, then serve the dashboard
//! - estimate: Print the supervisor timeout a run needs
//! - check-config: Validate the configuration file

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check_config, check_with, print_estimate, run, run_command, start, Output};
pub use errors::{CliError, CliErrorCode, CliResult};
