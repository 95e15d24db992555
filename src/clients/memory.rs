use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{clients::queue::MessagePublisher, models::message::Envelope};

/// Transport that keeps published envelopes in memory. Useful for local runs
/// and tests.
#[derive(Default)]
pub struct InMemoryTransport {
    sent: Mutex<Vec<Envelope>>,
    failure: Option<String>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose publishes and health checks always fail.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failure: Some(message.into()),
        }
    }

    pub async fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl MessagePublisher for InMemoryTransport {
    async fn publish(&self, envelope: &Envelope) -> Result<(), Error> {
        if let Some(message) = &self.failure {
            return Err(anyhow!(message.clone()));
        }

        self.sent.lock().await.push(envelope.clone());
        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        match &self.failure {
            Some(message) => Err(anyhow!(message.clone())),
            None => Ok(()),
        }
    }
}
