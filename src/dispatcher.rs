use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use crate::{
    clients::queue::MessagePublisher,
    error::DispatchError,
    models::message::{Envelope, SendRequest},
};

/// Stamps validated requests for routing and hands them to the transport.
/// Publishing is attempted once; retrying the enqueue is up to the caller.
pub struct Dispatcher {
    publisher: Arc<dyn MessagePublisher>,
}

impl Dispatcher {
    pub fn new(publisher: Arc<dyn MessagePublisher>) -> Self {
        Self { publisher }
    }

    /// `raw_body` is the caller's request exactly as received, logged if the
    /// publish fails.
    pub async fn dispatch(
        &self,
        request: &SendRequest,
        raw_body: &[u8],
    ) -> Result<Uuid, DispatchError> {
        let envelope = Envelope::new(request.clone());

        if let Err(e) = self.publisher.publish(&envelope).await {
            error!(
                request_id = %request.id,
                error = %e,
                request_body = %String::from_utf8_lossy(raw_body),
                "Queue send error"
            );
            return Err(DispatchError::Transport(e));
        }

        info!(
            request_id = %request.id,
            template_key = %request.template_key,
            group_id = %envelope.group_id,
            "Send request queued"
        );

        Ok(request.id)
    }
}
