//! CLI command implementations
//!
//! `run` follows a fixed sequence:
//! 1. Load and validate the configuration
//! 2. Build the logger
//! 3. Extend the supervisor start timeout by the run estimate
//! 4. Visit every supplier
//! 5. Print the report, mail it, report readiness
//! 6. Serve the dashboard until stopped

use std::io;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::config::Config;
use crate::dashboard::DashboardServer;
use crate::directory::{Directory, LdapDirectory};
use crate::notify::{notify, render_body, EmailSender, SmtpEmailSender};
use crate::observability::{Event, Logger};
use crate::verify::{Orchestrator, RunReport};
use crate::watchdog::{self, estimate};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{write_json, write_text};

/// Where the finished report is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Text,
    Json,
    Quiet,
}

impl Output {
    fn write(self, report: &RunReport) -> CliResult<()> {
        match self {
            Output::Text => write_text(&report.render_text()),
            Output::Json => write_json(report),
            Output::Quiet => Ok(()),
        }
    }
}

/// Estimate printed by `estimate --json`
#[derive(Debug, Serialize)]
struct EstimateOutput {
    suppliers: usize,
    consumers: usize,
    seconds: u64,
}

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run a parsed command
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Run {
            config,
            no_serve,
            json,
        } => start(&config, no_serve, json),
        Command::Estimate { config, json } => print_estimate(&config, json),
        Command::CheckConfig { config } => check_config(&config),
    }
}

/// Run the check against live directory servers
pub fn start(config_path: &Path, no_serve: bool, json: bool) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let logger = config.logging.build_logger()?;
    let path = config_path.display().to_string();
    logger.info(Event::ConfigLoaded, &[("path", path.as_str())]);

    let sender = config
        .notify
        .enabled
        .then(|| SmtpEmailSender::new(config.notify.clone()));
    let output = if json { Output::Json } else { Output::Text };

    let report = check_with(
        &config,
        &LdapDirectory::new(),
        sender.as_ref().map(|s| s as &dyn EmailSender),
        &logger,
        output,
    )?;

    if config.dashboard.enabled && !no_serve {
        let server = DashboardServer::new(config.dashboard.clone(), Arc::new(report));
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(server.start(&logger))?;
        return Ok(());
    }

    if report.success {
        Ok(())
    } else {
        Err(CliError::verification_failed())
    }
}

/// One verification run against `directory`
///
/// Prints the report, mails it when a sender is given, and reports the
/// outcome to the supervisor. A garbage invariant violation prints the
/// partial results to stderr and aborts without mail.
pub fn check_with(
    config: &Config,
    directory: &dyn Directory,
    sender: Option<&dyn EmailSender>,
    logger: &Logger,
    output: Output,
) -> CliResult<RunReport> {
    let topology = config.topology()?;
    let entry = config.test_entry()?;
    let timings = config.timings();

    let budget = estimate(&topology, &timings);
    supervisor(logger, "extend_timeout", watchdog::notify::extend_timeout(budget));

    let report = match Orchestrator::new(directory, &topology, &entry, timings, logger).run() {
        Ok(report) => report,
        Err(err) => {
            let partial = err.partial_results();
            if !partial.is_empty() {
                eprint!("{}", partial.render_text());
            }
            supervisor(
                logger,
                "status",
                watchdog::notify::notify_status("FAIL. Run aborted."),
            );
            return Err(err.into());
        }
    };

    output.write(&report)?;

    if let Some(sender) = sender {
        notify(
            sender,
            !report.success,
            &render_body(&report),
            config.notify.on_success,
            logger,
        );
    }

    supervisor(
        logger,
        "ready",
        watchdog::notify::notify_ready(&report.summary()),
    );
    Ok(report)
}

/// Log a supervisor notification; failures never stop the run
fn supervisor(logger: &Logger, state: &str, result: io::Result<bool>) {
    match result {
        Ok(true) => logger.info(Event::WatchdogNotify, &[("state", state)]),
        Ok(false) => {}
        Err(err) => logger.warn(
            Event::WatchdogNotify,
            &[("state", state), ("error", err.to_string().as_str())],
        ),
    }
}

/// Print the run estimate
pub fn print_estimate(config_path: &Path, json: bool) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let topology = config.topology()?;
    let seconds = estimate(&topology, &config.timings()).as_secs();

    if json {
        write_json(&EstimateOutput {
            suppliers: topology.supplier_count(),
            consumers: topology.consumer_count(),
            seconds,
        })
    } else {
        write_text(&format!(
            "{} suppliers, {} consumers: {}s",
            topology.supplier_count(),
            topology.consumer_count(),
            seconds
        ))
    }
}

/// Validate the configuration and exit
pub fn check_config(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    config.logging.build_logger()?;
    write_text(&format!("{}: OK", config_path.display()))
}
