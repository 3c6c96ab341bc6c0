//! Template rendering for pod manifests
//!
//! Thin wrapper around minijinja configured for strict undefined handling.
//! Templates are YAML pod manifest bodies; parameters are plain `Serialize`
//! records built by the tool variants. Parse failures and execution failures
//! are surfaced as distinct error variants so a bad template body can be told
//! apart from a bad parameter record.

use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during template rendering
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template body failed to parse
    #[error("template parse error: {0}")]
    Parse(#[source] minijinja::Error),

    /// Template executed against the parameter record and failed
    /// (undefined variable, bad filter input, ...)
    #[error("template execution error: {0}")]
    Execute(#[source] minijinja::Error),
}

/// Renderer for pod manifest templates
///
/// Undefined variables are strict errors: a template referencing a parameter
/// the tool variant did not supply fails at render time instead of emitting
/// an empty string into a pod manifest.
pub struct Renderer {
    env: Environment<'static>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    /// Create a new renderer with strict undefined-variable handling
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        Self { env }
    }

    /// Render a template body against a parameter record into a byte payload
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Parse`] if the body is not a valid template
    /// and [`TemplateError::Execute`] if rendering against `params` fails.
    pub fn render<P: Serialize>(&self, body: &str, params: &P) -> Result<Vec<u8>, TemplateError> {
        let tmpl = self
            .env
            .template_from_str(body)
            .map_err(TemplateError::Parse)?;
        let rendered = tmpl.render(params).map_err(TemplateError::Execute)?;
        Ok(rendered.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct PodParams {
        name: String,
        image: String,
    }

    fn params() -> PodParams {
        PodParams {
            name: "capstan-nginx-same-node".to_string(),
            image: "nginx:1.27".to_string(),
        }
    }

    #[test]
    fn renders_parameters_into_body() {
        let renderer = Renderer::new();
        let out = renderer
            .render("name: {{ name }}\nimage: {{ image }}\n", &params())
            .expect("should render");
        let out = String::from_utf8(out).unwrap();
        assert_eq!(out, "name: capstan-nginx-same-node\nimage: nginx:1.27\n");
    }

    #[test]
    fn bad_syntax_is_a_parse_error() {
        let renderer = Renderer::new();
        let err = renderer
            .render("name: {{ name", &params())
            .expect_err("unterminated expression should fail");
        assert!(matches!(err, TemplateError::Parse(_)));
        assert!(err.to_string().contains("parse"));
    }

    #[test]
    fn undefined_variable_is_an_execution_error() {
        let renderer = Renderer::new();
        let err = renderer
            .render("host: {{ pod_ip }}", &params())
            .expect_err("undefined variable should fail under strict mode");
        assert!(matches!(err, TemplateError::Execute(_)));
    }

    #[test]
    fn conditional_blocks_render_per_flag() {
        #[derive(Serialize)]
        struct Flagged {
            affinity: bool,
        }

        let renderer = Renderer::new();
        let body = "{% if affinity %}podAffinity{% else %}podAntiAffinity{% endif %}";
        let same = renderer.render(body, &Flagged { affinity: true }).unwrap();
        let diff = renderer.render(body, &Flagged { affinity: false }).unwrap();
        assert_eq!(same, b"podAffinity");
        assert_eq!(diff, b"podAntiAffinity");
    }
}
