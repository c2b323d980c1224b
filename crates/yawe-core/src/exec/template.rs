use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template syntax error: {0}")]
    Syntax(String),

    #[error("template render error: {0}")]
    Render(String),
}

/// Pure template rendering. Undefined variables are errors.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, bindings: &Value) -> Result<String, TemplateError>;
}
