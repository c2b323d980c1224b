//! minijinja-backed [`TemplateRenderer`].
//!
//! Strict undefined behavior: referencing a name that is not bound is an
//! error rather than an empty string, so a typo in a command template fails
//! the task before anything runs.

use minijinja::{Environment, ErrorKind, UndefinedBehavior, Value};
use yawe_core::exec::{TemplateError, TemplateRenderer};

pub struct MinijinjaRenderer {
    env: Environment<'static>,
}

impl MinijinjaRenderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        Self { env }
    }
}

impl Default for MinijinjaRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer for MinijinjaRenderer {
    fn render(&self, template: &str, bindings: &serde_json::Value) -> Result<String, TemplateError> {
        self.env
            .render_str(template, Value::from_serialize(bindings))
            .map_err(|e| match e.kind() {
                ErrorKind::SyntaxError => TemplateError::Syntax(e.to_string()),
                _ => TemplateError::Render(e.to_string()),
            })
    }
}
