//! Email delivery

use std::sync::RwLock;

use super::errors::{NotifyError, NotifyResult};
use crate::config::NotifyConfig;

/// One outgoing message, sent to every configured recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub body: String,
}

/// Email sender trait for abstraction
pub trait EmailSender: Send + Sync {
    /// Send a message
    fn send(&self, message: &EmailMessage) -> NotifyResult<()>;
}

/// Records messages instead of sending them
#[derive(Debug, Default)]
pub struct MockEmailSender {
    sent: RwLock<Vec<EmailMessage>>,
    fail_with: Option<String>,
}

impl MockEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender whose every `send` fails at the transport
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            sent: RwLock::default(),
            fail_with: Some(reason.into()),
        }
    }

    /// Number of messages accepted
    pub fn sent_count(&self) -> usize {
        self.sent.read().map(|sent| sent.len()).unwrap_or(0)
    }

    /// Messages accepted so far
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.read().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl EmailSender for MockEmailSender {
    fn send(&self, message: &EmailMessage) -> NotifyResult<()> {
        if let Some(reason) = &self.fail_with {
            return Err(NotifyError::Transport(reason.clone()));
        }
        let mut sent = self.sent.write().unwrap_or_else(|e| e.into_inner());
        sent.push(message.clone());
        Ok(())
    }
}

/// SMTP email sender
pub struct SmtpEmailSender {
    config: NotifyConfig,
}

impl SmtpEmailSender {
    pub fn new(config: NotifyConfig) -> Self {
        Self { config }
    }

    fn build(&self, message: &EmailMessage) -> NotifyResult<lettre::Message> {
        use lettre::message::{header::ContentType, Mailbox};

        let parse = |address: &str| -> NotifyResult<Mailbox> {
            address.parse().map_err(|e: lettre::address::AddressError| NotifyError::Address {
                address: address.to_string(),
                reason: e.to_string(),
            })
        };

        let mut builder = lettre::Message::builder()
            .from(parse(&self.config.from)?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN);
        for recipient in self.config.to.iter().filter(|r| !r.trim().is_empty()) {
            builder = builder.to(parse(recipient)?);
        }
        builder
            .body(message.body.clone())
            .map_err(|e| NotifyError::Build(e.to_string()))
    }
}

impl EmailSender for SmtpEmailSender {
    fn send(&self, message: &EmailMessage) -> NotifyResult<()> {
        use lettre::{transport::smtp::authentication::Credentials, SmtpTransport, Transport};

        let email = self.build(message)?;

        let mailer = if self.config.smtp_user.is_empty() {
            // Local relay, no authentication
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
                .port(self.config.smtp_port)
                .build()
        } else {
            let creds = Credentials::new(
                self.config.smtp_user.clone(),
                self.config.smtp_password.clone(),
            );

            SmtpTransport::relay(&self.config.smtp_host)
                .map_err(|e| NotifyError::Transport(format!("SMTP relay error: {}", e)))?
                .credentials(creds)
                .port(self.config.smtp_port)
                .build()
        };

        mailer
            .send(&email)
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(())
    }
}
