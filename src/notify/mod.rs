//! Report notification by email
//!
//! The run hands over its outcome and a preformatted body; delivery errors
//! are logged and never change the outcome.

mod email;
mod errors;
mod report;

pub use email::{EmailMessage, EmailSender, MockEmailSender, SmtpEmailSender};
pub use errors::{NotifyError, NotifyResult};
pub use report::{notify, render_body, subject};
