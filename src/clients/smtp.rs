use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Attachment, Mailbox, MultiPart, SinglePart, header::ContentType},
};
use tracing::{debug, info};

use crate::{
    clients::mailer::MailTransport,
    error::TransportError,
    models::email::Email,
};

/// SMTP transport configured from a `smtp://` or `smtps://` URL, with
/// credentials URL-encoded in the userinfo part.
pub struct SmtpMailer {
    url: String,
    timeout: Duration,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let url = url.into();
        let transport = Self::build_transport(&url, timeout)?;

        info!(timeout_seconds = timeout.as_secs(), "SMTP transport initialized");

        Ok(Self {
            url,
            timeout,
            transport,
        })
    }

    fn build_transport(
        url: &str,
        timeout: Duration,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, TransportError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::from_url(url)
            .map_err(|e| TransportError::Start(format!("invalid mailer URL: {}", e)))?
            .timeout(Some(timeout))
            .build();

        Ok(transport)
    }

    fn build_message(email: &Email) -> Result<Message, TransportError> {
        let from: Mailbox = email
            .from
            .parse()
            .map_err(|e| TransportError::Message(format!("invalid from address: {}", e)))?;
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| TransportError::Message(format!("invalid recipient address: {}", e)))?;

        let mut related = MultiPart::related().singlepart(SinglePart::html(email.body_html.clone()));
        for image in &email.inline_images {
            let content_type = ContentType::parse(&image.content_type).map_err(|e| {
                TransportError::Message(format!("invalid inline image type: {}", e))
            })?;
            related = related.singlepart(
                Attachment::new_inline(image.content_id.clone())
                    .body(image.bytes.clone(), content_type),
            );
        }

        Message::builder()
            .from(from)
            .to(to)
            .subject(email.subject.clone())
            .multipart(
                MultiPart::alternative()
                    .singlepart(SinglePart::plain(email.body_text.clone()))
                    .multipart(related),
            )
            .map_err(|e| TransportError::Message(e.to_string()))
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn ping(&self) -> bool {
        match self.transport.test_connection().await {
            Ok(alive) => alive,
            Err(e) => {
                debug!(error = %e, "SMTP connection test failed");
                false
            }
        }
    }

    async fn restart(&mut self) -> Result<(), TransportError> {
        let transport = Self::build_transport(&self.url, self.timeout)?;

        let alive = transport
            .test_connection()
            .await
            .map_err(|e| TransportError::Start(e.to_string()))?;
        if !alive {
            return Err(TransportError::Start("SMTP server did not respond".to_string()));
        }

        self.transport = transport;
        debug!("SMTP transport restarted");

        Ok(())
    }

    async fn send(&self, email: &Email) -> Result<usize, TransportError> {
        let message = Self::build_message(email)?;
        let recipients = message.envelope().to().len();

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;

        Ok(if response.is_positive() { recipients } else { 0 })
    }
}
