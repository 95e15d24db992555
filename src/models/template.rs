use serde::Deserialize;

/// Per-template settings. The template file lives at
/// `{template_path}/{template_key}.html.hbs`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateConfig {
    pub template_key: String,

    /// Format string with `%s` placeholders, `%%` for a literal percent sign.
    pub subject: String,

    /// Params merged into `subject`, in placeholder order. Repeats allowed.
    #[serde(default)]
    pub subject_params: Vec<String>,

    /// Params that must be present and non-blank. `false` and `0` count as present.
    #[serde(default)]
    pub required_params: Vec<String>,
}
