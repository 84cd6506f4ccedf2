//! Mail Transports
//!
//! SMTP delivery through `lettre`, plus a logging transport used when no
//! SMTP server is configured.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use crate::domain::port::{Mailer, OutgoingMail};
use crate::error::{AuthError, AuthResult};

/// SMTP connection settings
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings, from: &str) -> AuthResult<Self> {
        let from: Mailbox = from
            .parse()
            .map_err(|e| AuthError::Internal(format!("Invalid sender address: {}", e)))?;

        let creds = Credentials::new(settings.username.clone(), settings.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|e| AuthError::Internal(format!("Invalid SMTP relay: {}", e)))?
            .port(settings.port)
            .credentials(creds)
            .build();

        Ok(Self { transport, from })
    }

    fn build(&self, mail: &OutgoingMail) -> AuthResult<Message> {
        let to: Mailbox = mail
            .to
            .as_str()
            .parse()
            .map_err(|e| AuthError::EmailDelivery(format!("Invalid recipient: {}", e)))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(mail.html.clone())
            .map_err(|e| AuthError::EmailDelivery(e.to_string()))
    }
}

impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> AuthResult<()> {
        let message = self.build(&mail)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AuthError::EmailDelivery(e.to_string()))?;

        tracing::info!(to = %mail.to.masked(), subject = %mail.subject, "Email sent");
        Ok(())
    }
}

/// Logs instead of sending (development without SMTP)
#[derive(Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> AuthResult<()> {
        tracing::warn!(
            to = %mail.to.masked(),
            subject = %mail.subject,
            "SMTP not configured; email not delivered"
        );
        tracing::debug!(html = %mail.html, "Undelivered email body");
        Ok(())
    }
}

/// The transport chosen at startup
pub enum MailTransport {
    Smtp(SmtpMailer),
    Log(LogMailer),
}

impl MailTransport {
    /// SMTP when settings are present, logging otherwise.
    pub fn from_settings(settings: Option<&SmtpSettings>, from: &str) -> AuthResult<Self> {
        match settings {
            Some(settings) => Ok(Self::Smtp(SmtpMailer::new(settings, from)?)),
            None => Ok(Self::Log(LogMailer)),
        }
    }
}

impl Mailer for MailTransport {
    async fn send(&self, mail: OutgoingMail) -> AuthResult<()> {
        match self {
            MailTransport::Smtp(smtp) => smtp.send(mail).await,
            MailTransport::Log(log) => log.send(mail).await,
        }
    }
}
