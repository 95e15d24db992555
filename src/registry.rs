use std::{collections::HashMap, fs, path::Path};

use tracing::info;

use crate::{error::RegistryError, models::template::TemplateConfig, utils::count_placeholders};

/// Read-only lookup of template settings by key, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, TemplateConfig>,
}

impl TemplateRegistry {
    pub fn new(configs: Vec<TemplateConfig>) -> Result<Self, RegistryError> {
        let mut templates = HashMap::with_capacity(configs.len());

        for config in configs {
            if config.template_key.trim().is_empty() {
                return Err(RegistryError::EmptyKey);
            }

            let placeholders = count_placeholders(&config.subject);
            if placeholders != config.subject_params.len() {
                return Err(RegistryError::SubjectParamCount {
                    template_key: config.template_key,
                    placeholders,
                    params: config.subject_params.len(),
                });
            }

            if templates.contains_key(&config.template_key) {
                return Err(RegistryError::DuplicateKey(config.template_key));
            }

            templates.insert(config.template_key.clone(), config);
        }

        Ok(Self { templates })
    }

    /// Loads a JSON array of template configs.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();

        let raw = fs::read_to_string(path)
            .map_err(|e| RegistryError::Load(format!("{}: {}", path.display(), e)))?;
        let configs: Vec<TemplateConfig> =
            serde_json::from_str(&raw).map_err(|e| RegistryError::Load(e.to_string()))?;

        let registry = Self::new(configs)?;

        info!(
            path = %path.display(),
            template_count = registry.len(),
            "Template configs loaded"
        );

        Ok(registry)
    }

    pub fn get(&self, template_key: &str) -> Option<&TemplateConfig> {
        self.templates.get(template_key)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
