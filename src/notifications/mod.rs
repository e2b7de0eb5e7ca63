//! Outbound email: the transport boundary and the daily summary composer.

pub mod summary;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::time::Duration;
use thiserror::Error;

use crate::config::MailConfig;

/// Upper bound on a single SMTP delivery.
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure kinds at the send boundary. Callers catch these per recipient;
/// they never abort a batch.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("recipient has no email address")]
    RecipientMissing,
    #[error("failed to build message: {0}")]
    Message(String),
    #[error("smtp transport error: {0}")]
    Transport(String),
    #[error("send timed out after {0:?}")]
    Timeout(Duration),
}

impl SendError {
    /// Stable label for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            SendError::RecipientMissing => "recipient_missing",
            SendError::Message(_) => "message",
            SendError::Transport(_) => "transport",
            SendError::Timeout(_) => "timeout",
        }
    }
}

/// Sends one plain-text message to one recipient.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, subject: &str, body: &str, recipient: &str) -> Result<(), SendError>;
}

/// SMTP implementation over lettre's async transport.
pub struct SmtpMailer {
    config: MailConfig,
}

impl SmtpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, SendError> {
        let host = self
            .config
            .smtp_host
            .as_ref()
            .ok_or_else(|| SendError::Transport("SMTP host not configured".to_string()))?;

        let builder = if self.config.smtp_use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| SendError::Transport(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        }
        .port(self.config.smtp_port);

        let builder = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            builder
        };

        Ok(builder.build())
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, subject: &str, body: &str, recipient: &str) -> Result<(), SendError> {
        if recipient.is_empty() {
            return Err(SendError::RecipientMissing);
        }

        let sender = self
            .config
            .sender_address()
            .ok_or_else(|| SendError::Message("sender address not configured".to_string()))?;
        let from: Mailbox = sender
            .parse()
            .map_err(|e| SendError::Message(format!("invalid sender address: {}", e)))?;
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| SendError::Message(format!("invalid recipient address: {}", e)))?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(body.to_string()),
            )
            .map_err(|e| SendError::Message(e.to_string()))?;

        let mailer = self.build_transport()?;

        match tokio::time::timeout(SEND_TIMEOUT, mailer.send(email)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(SendError::Transport(e.to_string())),
            Err(_) => Err(SendError::Timeout(SEND_TIMEOUT)),
        }
    }
}
