use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{error, info};

use crate::{
    clients::{
        mailer::RecoveringMailer,
        template::{TemplateRenderer, render_body},
    },
    config::PRODUCTION_ENV,
    error::{ConsumeError, Rejection},
    models::{
        email::{Email, InlineImage},
        message::SendRequest,
        status::Delivery,
    },
    registry::TemplateRegistry,
    utils::{format_subject, hash_recipient, merge_value_to_string},
    validator::RequestValidator,
};

pub const HEADER_IMAGE_CONTENT_ID: &str = "header-image";

#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    pub app_env: String,
    pub sender_address: String,
    pub log_hash_pepper: String,
    pub suppressed_recipient_markers: Vec<String>,
}

impl ConsumerSettings {
    pub fn is_production(&self) -> bool {
        self.app_env == PRODUCTION_ENV
    }
}

/// Turns queued send requests into delivered emails, one at a time.
pub struct Consumer {
    settings: ConsumerSettings,
    registry: Arc<TemplateRegistry>,
    validator: Arc<RequestValidator>,
    renderer: Arc<dyn TemplateRenderer>,
    mailer: RecoveringMailer,
    header_image: Option<InlineImage>,
}

impl Consumer {
    pub fn new(
        settings: ConsumerSettings,
        registry: Arc<TemplateRegistry>,
        validator: Arc<RequestValidator>,
        renderer: Arc<dyn TemplateRenderer>,
        mailer: RecoveringMailer,
    ) -> Self {
        Self {
            settings,
            registry,
            validator,
            renderer,
            mailer,
            header_image: None,
        }
    }

    /// Embeds `image` in every email and exposes it to templates as `headerImageRef`.
    pub fn with_header_image(mut self, image: InlineImage) -> Self {
        self.header_image = Some(image);
        self
    }

    pub async fn handle_payload(&mut self, payload: &[u8]) -> Result<Delivery, ConsumeError> {
        let request: SendRequest = serde_json::from_slice(payload).map_err(|e| {
            error!(error = %e, "Could not decode queued send request");
            ConsumeError::Decode(e.to_string())
        })?;

        self.handle(&request).await
    }

    pub async fn handle(&mut self, request: &SendRequest) -> Result<Delivery, ConsumeError> {
        let recipient_hash = hash_recipient(
            &self.settings.log_hash_pepper,
            &request.recipient_email_address,
        );

        // Config can change between enqueue and consume.
        if let Err(rejection) = self.validator.validate(request, true) {
            return Err(self.fail(request, &recipient_hash, rejection.into()));
        }

        info!(request_id = %request.id, template_key = %request.template_key, "Processing send request");

        let config = self
            .registry
            .get(&request.template_key)
            .ok_or_else(|| Rejection::UnknownTemplate(request.template_key.clone()));
        let config = match config {
            Ok(config) => config,
            Err(rejection) => return Err(self.fail(request, &recipient_hash, rejection.into())),
        };

        let body = match render_body(
            self.renderer.as_ref(),
            &request.template_key,
            &request.params,
            &self.injected_params(),
        ) {
            Ok(body) => body,
            Err(e) => return Err(self.fail(request, &recipient_hash, e.into())),
        };

        let subject_values: Vec<String> = config
            .subject_params
            .iter()
            .map(|name| {
                request
                    .params
                    .get(name)
                    .map(merge_value_to_string)
                    .unwrap_or_default()
            })
            .collect();
        let subject = self.tag_subject(format_subject(&config.subject, &subject_values), request);

        if self.is_suppressed(&request.recipient_email_address) {
            info!(
                request_id = %request.id,
                recipient_hash = %recipient_hash,
                env = %self.settings.app_env,
                "Recipient matches a suppression marker, skipping send"
            );
            return Ok(Delivery::Suppressed);
        }

        let email = Email {
            from: self.settings.sender_address.clone(),
            to: request.recipient_email_address.clone(),
            subject,
            body_html: body.html,
            body_text: body.text,
            inline_images: self.header_image.iter().cloned().collect(),
        };

        if let Err(e) = self.mailer.send_with_recovery(&email).await {
            return Err(self.fail(request, &recipient_hash, e.into()));
        }

        info!(
            request_id = %request.id,
            recipient_hash = %recipient_hash,
            template_key = %request.template_key,
            "Sent email"
        );

        Ok(Delivery::Sent)
    }

    fn injected_params(&self) -> Map<String, Value> {
        let mut injected = Map::new();
        injected.insert("renderHtml".to_string(), Value::Bool(true));

        if let Some(image) = &self.header_image {
            injected.insert(
                "headerImageRef".to_string(),
                Value::String(format!("cid:{}", image.content_id)),
            );
        }

        injected
    }

    fn tag_subject(&self, subject: String, request: &SendRequest) -> String {
        if self.settings.is_production() {
            return subject;
        }

        match &request.sending_application {
            Some(app) if !app.is_empty() => {
                format!("({}, {}) {}", self.settings.app_env, app, subject)
            }
            _ => format!("({}) {}", self.settings.app_env, subject),
        }
    }

    fn is_suppressed(&self, recipient: &str) -> bool {
        if self.settings.is_production() {
            return false;
        }

        let recipient = recipient.to_lowercase();
        self.settings
            .suppressed_recipient_markers
            .iter()
            .filter(|marker| !marker.is_empty())
            .any(|marker| recipient.contains(&marker.to_lowercase()))
    }

    fn fail(&self, request: &SendRequest, recipient_hash: &str, error: ConsumeError) -> ConsumeError {
        error!(
            request_id = %request.id,
            recipient_hash = %recipient_hash,
            permanent = error.is_permanent(),
            reason = %error,
            "Sending failed"
        );
        error
    }
}
