use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Body of `POST /v1/send`. Absent fields deserialize as empty so the
/// validator can report them as missing data rather than a decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequestPayload {
    #[serde(default)]
    pub template_key: String,
    #[serde(default)]
    pub recipient_email_address: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub sending_application: Option<String>,
}

/// One email to send, as queued and consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub id: Uuid,
    #[serde(default)]
    pub template_key: String,
    #[serde(default)]
    pub recipient_email_address: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    pub env: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sending_application: Option<String>,
}

impl SendRequest {
    pub fn new(payload: SendRequestPayload, env: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            template_key: payload.template_key,
            recipient_email_address: payload.recipient_email_address,
            params: payload.params,
            env: env.into(),
            sending_application: payload.sending_application,
        }
    }

    pub fn with_sending_application(mut self, sending_application: impl Into<String>) -> Self {
        self.sending_application = Some(sending_application.into());
        self
    }

    /// Key used to group deliveries of the same request on transports that
    /// support ordered groups.
    pub fn group_id(&self) -> String {
        format!("send-request-{}", self.id)
    }
}

/// A request plus the stamps the transport needs to route it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub message_id: String,
    pub group_id: String,
    pub data: SendRequest,
}

impl Envelope {
    pub fn new(data: SendRequest) -> Self {
        Self {
            message_id: data.id.to_string(),
            group_id: data.group_id(),
            data,
        }
    }

    /// Wire body of the queued message.
    pub fn payload(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.data)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FailedPayload {
    Decoded(SendRequest),
    Raw(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqMessage {
    pub original_message: FailedPayload,
    pub failure_reason: String,
    pub retryable: bool,
    pub failed_at: String,
}
