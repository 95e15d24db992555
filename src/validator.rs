use std::sync::Arc;

use serde_json::Value;
use tracing::error;

use crate::{
    clients::template::TemplateRenderer,
    error::{RenderError, Rejection},
    models::message::SendRequest,
    registry::TemplateRegistry,
};

/// Checks a send request against its template config. Checks run in a fixed
/// order and the first failure is the one reported.
pub struct RequestValidator {
    registry: Arc<TemplateRegistry>,
    renderer: Arc<dyn TemplateRenderer>,
    app_env: String,
}

impl RequestValidator {
    pub fn new(
        registry: Arc<TemplateRegistry>,
        renderer: Arc<dyn TemplateRenderer>,
        app_env: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            renderer,
            app_env: app_env.into(),
        }
    }

    /// With `full_render_check` the template is actually rendered; without it
    /// only the template file's presence is checked.
    pub fn validate(&self, request: &SendRequest, full_render_check: bool) -> Result<(), Rejection> {
        if request.template_key.is_empty()
            || request.recipient_email_address.is_empty()
            || request.params.is_empty()
        {
            return Err(Rejection::MissingData);
        }

        let config = self
            .registry
            .get(&request.template_key)
            .ok_or_else(|| Rejection::UnknownTemplate(request.template_key.clone()))?;

        if let Some(missing) = config
            .subject_params
            .iter()
            .find(|name| !request.params.contains_key(name.as_str()))
        {
            error!(
                request_id = %request.id,
                template_key = %request.template_key,
                subject_param = %missing,
                "Subject param not supplied; template config and callers disagree"
            );
            return Err(Rejection::MissingSubjectParam(missing.clone()));
        }

        if let Some(missing) = config
            .required_params
            .iter()
            .find(|name| is_blank(request.params.get(name.as_str())))
        {
            return Err(Rejection::MissingRequiredParam(missing.clone()));
        }

        if full_render_check {
            self.renderer
                .render(&request.template_key, &request.params)
                .map_err(|e| match e {
                    RenderError::NotFound(key) => Rejection::TemplateFileNotFound(key),
                    RenderError::Failed(detail) => Rejection::RenderFailed(detail),
                })?;
        } else if !self.renderer.template_exists(&request.template_key) {
            return Err(Rejection::TemplateFileNotFound(request.template_key.clone()));
        }

        if request.env != self.app_env {
            return Err(Rejection::EnvMismatch(request.env.clone()));
        }

        Ok(())
    }
}

/// Missing, `null` and `""` are blank. `false` and `0` are values.
fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}
