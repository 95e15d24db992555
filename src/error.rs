use thiserror::Error;

/// Why a send request was refused. The display text is the caller-facing reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Missing required data")]
    MissingData,

    #[error("Template config for {0} not found")]
    UnknownTemplate(String),

    #[error("Missing subject param '{0}'")]
    MissingSubjectParam(String),

    #[error("Missing required param '{0}'")]
    MissingRequiredParam(String),

    #[error("Template file for {0} not found")]
    TemplateFileNotFound(String),

    #[error("Template render failed: {0}")]
    RenderFailed(String),

    #[error("Cannot process messages for '{0}' env")]
    EnvMismatch(String),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template file for {0} not found")]
    NotFound(String),

    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport start failed: {0}")]
    Start(String),

    #[error("{0}")]
    Send(String),

    #[error("email send reached no recipients")]
    NoRecipients,

    #[error("invalid message: {0}")]
    Message(String),
}

impl TransportError {
    /// Whether a fresh connection could make the same send succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, TransportError::Message(_))
    }
}

#[derive(Debug, Error)]
pub enum ConsumeError {
    #[error("Non-deserialisable message: {0}")]
    Decode(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] Rejection),

    #[error("Template render failed: {0}")]
    Render(#[from] RenderError),

    #[error("Email send failed. {0}")]
    Delivery(#[from] TransportError),
}

impl ConsumeError {
    /// Validation failures are not permanent: a config rollout may still be
    /// reaching the consumers.
    pub fn is_permanent(&self) -> bool {
        !matches!(self, ConsumeError::Validation(_))
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("queue send error: {0}")]
    Transport(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("template config has an empty templateKey")]
    EmptyKey,

    #[error("template config for {0} is defined more than once")]
    DuplicateKey(String),

    #[error("subject for {template_key} has {placeholders} placeholder(s) but {params} subjectParams")]
    SubjectParamCount {
        template_key: String,
        placeholders: usize,
        params: usize,
    },

    #[error("failed to load template configs: {0}")]
    Load(String),
}
