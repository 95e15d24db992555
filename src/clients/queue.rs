use anyhow::{Error, Result};
use async_trait::async_trait;

use crate::models::message::Envelope;

/// Publishing side of the asynchronous transport.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, envelope: &Envelope) -> Result<(), Error>;

    async fn health_check(&self) -> Result<(), Error>;
}
