use std::path::Path;
use std::sync::Arc;

use minijinja::{Environment, context};
use stager_core::Worker;
use tracing::warn;

const LOADING_TEMPLATE_NAME: &str = "loading.html";
const LOADING_FALLBACK: &str = include_str!("../templates/loading.html");

/// Renders the "loading" page shown to idempotent requests against a
/// not-yet-ready worker.
///
/// Rather than treating a missing resource directory or template file as a
/// startup-fatal misconfiguration, this falls back to a minimal built-in page
/// compiled into the binary via `include_str!`.
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn load(resource_dir: Option<&Path>) -> Self {
        let mut env = Environment::new();

        let source = resource_dir
            .map(|dir| dir.join(LOADING_TEMPLATE_NAME))
            .and_then(|path| match std::fs::read_to_string(&path) {
                Ok(contents) => Some(contents),
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "loading template not found in resource dir, using built-in fallback"
                    );
                    None
                }
            })
            .unwrap_or_else(|| LOADING_FALLBACK.to_string());

        env.add_template_owned(LOADING_TEMPLATE_NAME, source)
            .expect("loading template failed to compile");

        Self { env }
    }

    pub fn render_loading(&self, worker: &Worker) -> String {
        let tmpl = self
            .env
            .get_template(LOADING_TEMPLATE_NAME)
            .expect("loading template is always registered");
        tmpl.render(context! { name => worker.name, port => worker.port, state => worker.state.load().to_string() })
            .unwrap_or_else(|err| {
                warn!(error = %err, "loading template render failed, falling back to plain text");
                format!("starting {}...", worker.name)
            })
    }
}

pub fn templates(resource_dir: Option<&Path>) -> Arc<Templates> {
    Arc::new(Templates::load(resource_dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn worker() -> Worker {
        Worker::new(
            "acme".to_string(),
            4200,
            Url::parse("http://127.0.0.1:4200").unwrap(),
            reqwest::Client::new(),
        )
    }

    #[test]
    fn falls_back_to_builtin_template_when_no_resource_dir() {
        let templates = Templates::load(None);
        let body = templates.render_loading(&worker());
        assert!(body.contains("acme"));
    }

    #[test]
    fn falls_back_when_resource_dir_has_no_loading_template() {
        let dir = std::env::temp_dir().join(format!("stager-tmpl-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let templates = Templates::load(Some(&dir));
        let body = templates.render_loading(&worker());
        assert!(body.contains("acme"));
        let _ = std::fs::remove_dir(&dir);
    }
}
