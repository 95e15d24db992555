use serde::Serialize;
use uuid::Uuid;

pub const BAD_REQUEST: &str = "BAD_REQUEST";

#[derive(Debug, Clone, Serialize)]
pub struct SendResponse {
    pub status: String,
    pub id: Uuid,
}

impl SendResponse {
    pub fn queued(id: Uuid) -> Self {
        Self {
            status: "queued".to_string(),
            id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: ActionError,
}

impl ErrorResponse {
    pub fn bad_request(description: impl Into<String>) -> Self {
        Self {
            error: ActionError {
                error_type: BAD_REQUEST.to_string(),
                description: description.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UnauthorizedResponse {
    pub error: &'static str,
}

impl Default for UnauthorizedResponse {
    fn default() -> Self {
        Self {
            error: "Unauthorized",
        }
    }
}
