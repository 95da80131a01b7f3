use super::{MailMessage, MailTransport};
use crate::config::MailConfig;
use crate::{Result, TestError};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::debug;

/// SMTP delivery over tokio.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig, timeout: Duration) -> Result<Self> {
        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| TestError::Config(format!("Invalid SMTP relay {}: {}", config.host, e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        let mut builder = builder.port(config.port).timeout(Some(timeout));
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

fn mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|e| TestError::Notification(format!("Invalid address '{}': {}", address, e)))
}

/// Builds the MIME message; attachment files are read here.
pub async fn build_message(message: &MailMessage) -> Result<Message> {
    let mut builder = Message::builder()
        .from(mailbox(&message.from)?)
        .subject(&message.subject);
    for recipient in &message.to {
        builder = builder.to(mailbox(recipient)?);
    }

    let mut body = MultiPart::mixed().singlepart(SinglePart::html(message.html.clone()));
    for attachment in &message.attachments {
        let bytes = tokio::fs::read(&attachment.path).await?;
        let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
            TestError::Notification(format!(
                "Invalid content type '{}': {}",
                attachment.content_type, e
            ))
        })?;
        body = body.singlepart(Attachment::new(attachment.filename.clone()).body(bytes, content_type));
    }

    builder
        .multipart(body)
        .map_err(|e| TestError::Notification(format!("Failed to build message: {}", e)))
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        let email = build_message(message).await?;
        let response = self
            .transport
            .send(email)
            .await
            .map_err(|e| TestError::Notification(format!("SMTP send failed: {}", e)))?;
        debug!(code = %response.code(), "smtp accepted message");
        Ok(())
    }
}
