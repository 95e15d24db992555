use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HealthStatus {
    #[serde(rename = "OK")]
    Healthy,
    #[serde(rename = "ERROR")]
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    pub status: HealthStatus,
}
