//! Report mail

use super::email::{EmailMessage, EmailSender};
use crate::observability::{Event, Logger};
use crate::verify::RunReport;

/// Subject line for a run outcome
pub fn subject(failed: bool) -> String {
    if failed {
        "ds-repltest: replication check FAILED".to_string()
    } else {
        "ds-repltest: replication check OK".to_string()
    }
}

/// Plain text body for a finished run
pub fn render_body(report: &RunReport) -> String {
    format!(
        "Replication check finished on {}.\n\n{}",
        report.finished_at.format("%d/%m/%Y at %H:%M:%S"),
        report.render_text()
    )
}

/// Send the report mail
///
/// Sends on failure, and on success only with `on_success`. A transport
/// failure is logged and reported as `false`. Returns true when a message
/// was handed to the sender.
pub fn notify(
    sender: &dyn EmailSender,
    failed: bool,
    body: &str,
    on_success: bool,
    logger: &Logger,
) -> bool {
    if !failed && !on_success {
        return false;
    }
    let message = EmailMessage {
        subject: subject(failed),
        body: body.to_string(),
    };
    match sender.send(&message) {
        Ok(()) => {
            logger.info(Event::NotificationSent, &[("subject", message.subject.as_str())]);
            true
        }
        Err(err) => {
            logger.error(
                Event::NotificationFailed,
                &[("error", err.to_string().as_str())],
            );
            false
        }
    }
}
