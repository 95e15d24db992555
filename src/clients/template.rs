use std::{fs, io::ErrorKind, path::PathBuf};

use handlebars::Handlebars;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::{error::RenderError, utils::strip_tags};

pub const TEMPLATE_EXTENSION: &str = "html.hbs";

/// Turns a template key plus merge params into HTML.
pub trait TemplateRenderer: Send + Sync {
    /// Cheap presence check, no render.
    fn template_exists(&self, template_key: &str) -> bool;

    fn render(&self, template_key: &str, params: &Map<String, Value>) -> Result<String, RenderError>;
}

/// Reads `{template_path}/{key}.html.hbs` from disk on every render.
pub struct HandlebarsRenderer {
    handlebars: Handlebars<'static>,
    template_path: PathBuf,
}

impl HandlebarsRenderer {
    pub fn new(template_path: impl Into<PathBuf>) -> Self {
        let template_path = template_path.into();

        info!(template_path = %template_path.display(), "Template renderer initialized");

        Self {
            handlebars: Handlebars::new(),
            template_path,
        }
    }

    pub fn template_file(&self, template_key: &str) -> PathBuf {
        self.template_path
            .join(format!("{}.{}", template_key, TEMPLATE_EXTENSION))
    }
}

impl TemplateRenderer for HandlebarsRenderer {
    fn template_exists(&self, template_key: &str) -> bool {
        self.template_file(template_key).is_file()
    }

    fn render(&self, template_key: &str, params: &Map<String, Value>) -> Result<String, RenderError> {
        let path = self.template_file(template_key);

        let source = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => RenderError::NotFound(template_key.to_string()),
            _ => RenderError::Failed(format!("{}: {}", path.display(), e)),
        })?;

        debug!(template_key, param_count = params.len(), "Rendering template");

        self.handlebars
            .render_template(&source, params)
            .map_err(|e| RenderError::Failed(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBody {
    pub html: String,
    pub text: String,
}

/// Renders the HTML part with `injected` values under the caller's params
/// (caller keys win), and the plain-text part from the caller's params alone
/// with tags stripped.
pub fn render_body(
    renderer: &dyn TemplateRenderer,
    template_key: &str,
    params: &Map<String, Value>,
    injected: &Map<String, Value>,
) -> Result<RenderedBody, RenderError> {
    let mut merged = injected.clone();
    merged.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));

    let html = renderer.render(template_key, &merged)?;
    let text = strip_tags(&renderer.render(template_key, params)?);

    Ok(RenderedBody { html, text })
}
