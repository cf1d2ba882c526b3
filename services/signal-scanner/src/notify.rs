//! Email delivery of the scan report.
//!
//! Sends the HTML report over SMTP with STARTTLS. Delivery never fails the
//! run: an incomplete configuration is skipped with a warning and a send
//! error is logged.

use std::time::Duration;

use lettre::address::AddressError;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use scan_common::config::EmailConfig;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors building or sending a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Invalid address {address}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: AddressError,
    },

    #[error("Failed to build email: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Send task failed: {0}")]
    Task(String),
}

/// Outcome of one notification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Disabled,
    /// Enabled but not configured well enough to try
    Skipped(&'static str),
    Sent { recipients: usize },
    Failed(String),
}

/// SMTP notifier for the HTML report.
#[derive(Debug, Clone)]
pub struct EmailNotifier {
    config: EmailConfig,
    timeout: Duration,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }

    /// Send `html` to every configured recipient.
    pub async fn send(&self, html: String) -> Delivery {
        if !self.config.enabled {
            debug!("Email notification disabled");
            return Delivery::Disabled;
        }

        let Some((sender, password)) = self.config.credentials() else {
            warn!("Email enabled but sender or password missing, skipping notification");
            return Delivery::Skipped("sender or password missing");
        };
        if self.config.recipients.is_empty() {
            warn!("Email enabled but no recipients configured, skipping notification");
            return Delivery::Skipped("no recipients");
        }

        let recipients = self.config.recipients.len();
        match self.deliver(sender, password, html).await {
            Ok(()) => {
                info!(
                    recipients,
                    server = %self.config.smtp_server,
                    "Scan report emailed"
                );
                Delivery::Sent { recipients }
            }
            Err(e) => {
                error!(
                    error = %e,
                    server = %self.config.smtp_server,
                    "Failed to email scan report"
                );
                Delivery::Failed(e.to_string())
            }
        }
    }

    /// Build the HTML message from `sender` to every recipient.
    pub fn build_message(&self, sender: &str, html: String) -> Result<Message, NotifyError> {
        let mut builder = Message::builder()
            .from(mailbox(sender)?)
            .subject(self.config.subject.clone())
            .header(ContentType::TEXT_HTML);
        for recipient in &self.config.recipients {
            builder = builder.to(mailbox(recipient)?);
        }
        Ok(builder.body(html)?)
    }

    async fn deliver(&self, sender: &str, password: &str, html: String) -> Result<(), NotifyError> {
        let message = self.build_message(sender, html)?;
        let creds = Credentials::new(sender.to_string(), password.to_string());
        let transport = SmtpTransport::starttls_relay(&self.config.smtp_server)?
            .port(self.config.smtp_port)
            .credentials(creds)
            .timeout(Some(self.timeout))
            .build();

        // lettre's SmtpTransport blocks
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| NotifyError::Task(e.to_string()))??;
        Ok(())
    }
}

fn mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .trim()
        .parse()
        .map_err(|source| NotifyError::InvalidAddress {
            address: address.to_string(),
            source,
        })
}
