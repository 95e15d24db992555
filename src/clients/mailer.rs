use async_trait::async_trait;
use tracing::{info, warn};

use crate::{error::TransportError, models::email::Email};

/// A mail transport holding a long-lived connection.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Whether the current connection is still usable.
    async fn ping(&self) -> bool;

    /// Drops the current connection and opens a fresh one.
    async fn restart(&mut self) -> Result<(), TransportError>;

    /// Sends one email and returns how many recipients were accepted.
    async fn send(&self, email: &Email) -> Result<usize, TransportError>;
}

/// Wraps a transport with the stale-connection policy: ping and restart
/// before sending, then restart and retry exactly once on a transient failure.
pub struct RecoveringMailer {
    transport: Box<dyn MailTransport>,
}

impl RecoveringMailer {
    pub fn new(transport: Box<dyn MailTransport>) -> Self {
        Self { transport }
    }

    pub async fn send_with_recovery(&mut self, email: &Email) -> Result<(), TransportError> {
        if !self.transport.ping().await {
            info!("Mail transport connection is stale, restarting");
            self.transport.restart().await?;
        }

        let first_error = match self.attempt(email).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_transient() => e,
            Err(e) => return Err(e),
        };

        warn!(error = %first_error, "Email send failed, restarting transport and retrying once");

        self.transport.restart().await?;
        self.attempt(email).await
    }

    async fn attempt(&self, email: &Email) -> Result<(), TransportError> {
        match self.transport.send(email).await? {
            0 => Err(TransportError::NoRecipients),
            _ => Ok(()),
        }
    }
}
