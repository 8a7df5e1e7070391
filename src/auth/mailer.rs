use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::config::{MailConfig, SmtpConfig, SmtpSecurity};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("mail transport misconfigured: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
    /// The action link embedded in the body.
    pub link: String,
}

/// Outbound email collaborator.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Writes outgoing mail to the log instead of delivering it.
#[derive(Debug, Clone)]
pub struct LogMailer {
    sender: String,
}

impl LogMailer {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        tracing::info!(
            from = %self.sender,
            to = %email.to,
            subject = %email.subject,
            link = %email.link,
            "Outgoing email"
        );
        Ok(())
    }
}

/// Delivers mail through an SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailer {
    /// Builds the transport. No connection is made until the first send.
    pub fn new(config: &SmtpConfig, sender: &str) -> Result<Self, MailError> {
        let sender: Mailbox = sender
            .parse()
            .map_err(|e| MailError::Transport(format!("sender {sender}: {e}")))?;

        let builder = match config.security {
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host),
            SmtpSecurity::Starttls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            }
            SmtpSecurity::None => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(
                config.host.as_str(),
            )),
        }
        .map_err(|e| MailError::Transport(e.to_string()))?;

        let mut builder = builder.port(config.port());
        if let Some(username) = &config.username {
            let password = config.password.clone().unwrap_or_default();
            builder = builder.credentials(Credentials::new(username.clone(), password));
        }

        Ok(Self {
            transport: builder.build(),
            sender,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| MailError::Delivery(format!("recipient {}: {e}", email.to)))?;

        let message = Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.body)
            .map_err(|e| MailError::Delivery(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Delivery(e.to_string()))?;

        tracing::debug!(to = %email.to, "Email delivered");
        Ok(())
    }
}

/// SMTP when `[mail.smtp]` is configured, the log otherwise.
pub fn from_config(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match &config.smtp {
        Some(smtp) => {
            tracing::info!("Sending mail through {}:{}", smtp.host, smtp.port());
            Ok(Arc::new(SmtpMailer::new(smtp, &config.sender)?))
        }
        None => {
            tracing::warn!("No SMTP relay configured; outgoing mail is only logged");
            Ok(Arc::new(LogMailer::new(config.sender.clone())))
        }
    }
}

pub fn verification_email(to: &str, link_base: &str, token: &str) -> Email {
    let link = format!("{}/email_verified/{}", link_base.trim_end_matches('/'), token);
    Email {
        to: to.to_string(),
        subject: "Email verification".to_string(),
        body: format!(
            "Hello, please click on this link to verify your email.\n<a href=\"{link}\">Verify email</a>"
        ),
        link,
    }
}

pub fn password_reset_email(to: &str, link_base: &str, token: &str) -> Email {
    let link = format!("{}/reset-password/{}", link_base.trim_end_matches('/'), token);
    Email {
        to: to.to_string(),
        subject: "Reset password".to_string(),
        body: format!(
            "Hello, please click on this link to reset your password.\n<a href=\"{link}\">Reset password</a>"
        ),
        link,
    }
}
