//! SMTP email channel

use super::Notifier;
use crate::error::NotifyError;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Port where the server expects TLS from the first byte
const IMPLICIT_TLS_PORT: u16 = 465;

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// SMTP server and envelope settings
#[derive(Clone, PartialEq, Eq)]
pub struct EmailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from: String,
    pub to: Vec<String>,
    /// STARTTLS, or implicit TLS on port 465
    pub use_tls: bool,
}

impl fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailSettings")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"***")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("use_tls", &self.use_tls)
            .finish()
    }
}

/// Sends plain-text mail through an SMTP relay
pub struct EmailNotifier {
    settings: EmailSettings,
}

impl EmailNotifier {
    pub fn new(settings: EmailSettings) -> Self {
        Self { settings }
    }

    /// Builds the message for `subject` and `body`
    pub fn build_message(&self, subject: &str, body: &str) -> Result<Message, NotifyError> {
        let from: Mailbox = self
            .settings
            .from
            .parse()
            .map_err(|e| email_error(format!("invalid sender '{}': {}", self.settings.from, e)))?;

        let mut builder = Message::builder()
            .from(from)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.settings.to {
            let mailbox: Mailbox = recipient
                .parse()
                .map_err(|e| email_error(format!("invalid recipient '{}': {}", recipient, e)))?;
            builder = builder.to(mailbox);
        }

        builder
            .body(body.to_string())
            .map_err(|e| email_error(format!("failed to build message: {}", e)))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotifyError> {
        let host = self.settings.smtp_host.as_str();
        let builder = if !self.settings.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        } else if self.settings.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| email_error(format!("failed to set up TLS for {}: {}", host, e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| email_error(format!("failed to set up STARTTLS for {}: {}", host, e)))?
        };

        let mut builder = builder
            .port(self.settings.smtp_port)
            .timeout(Some(SMTP_TIMEOUT));
        if !self.settings.smtp_username.is_empty() && !self.settings.smtp_password.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.settings.smtp_username.clone(),
                self.settings.smtp_password.clone(),
            ));
        }
        Ok(builder.build())
    }
}

fn email_error(message: String) -> NotifyError {
    NotifyError::Email { message }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn channel(&self) -> &'static str {
        "email"
    }

    async fn send(
        &self,
        cancel: &CancellationToken,
        subject: &str,
        message: &str,
    ) -> Result<(), NotifyError> {
        let email = self.build_message(subject, message)?;
        let transport = self.transport()?;

        debug!(
            smtp_host = %self.settings.smtp_host,
            smtp_port = self.settings.smtp_port,
            from = %self.settings.from,
            to = ?self.settings.to,
            subject = %subject,
            "sending email notification"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(NotifyError::Cancelled),
            result = transport.send(email) => {
                result.map_err(|e| email_error(e.to_string()))?;
                info!(to = ?self.settings.to, "email notification sent");
                Ok(())
            }
        }
    }
}
