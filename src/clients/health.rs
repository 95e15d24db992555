use std::{sync::Arc, time::Instant};

use tracing::{debug, warn};

use crate::{clients::queue::MessagePublisher, models::health::HealthStatus};

pub struct HealthChecker {
    publisher: Arc<dyn MessagePublisher>,
}

impl HealthChecker {
    pub fn new(publisher: Arc<dyn MessagePublisher>) -> Self {
        Self { publisher }
    }

    pub async fn check(&self) -> HealthStatus {
        let start = Instant::now();

        match self.publisher.health_check().await {
            Ok(_) => {
                let elapsed = start.elapsed().as_millis() as u64;
                debug!(response_time_ms = elapsed, "Message broker health check passed");
                HealthStatus::Healthy
            }
            Err(e) => {
                warn!(error = %e, "Message broker health check failed");
                HealthStatus::Unhealthy
            }
        }
    }
}
