//! The single HTML page.

use crate::config::{Config, NX_VERSIONS};
use crate::provider::{MAX_TOKENS_RANGE, MODELS};
use minijinja::{Environment, context};

const INDEX_TEMPLATE: &str = include_str!("index.html");

pub struct Page {
    env: Environment<'static>,
}

impl Page {
    #[must_use]
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("index.html", INDEX_TEMPLATE)
            .expect("INDEX_TEMPLATE must be valid minijinja syntax");
        Self { env }
    }

    /// Render the page with the selector options of `config`.
    #[must_use]
    pub fn render(&self, config: &Config) -> String {
        let accept = config
            .allowed_extensions
            .iter()
            .map(|ext| format!(".{ext}"))
            .collect::<Vec<_>>()
            .join(",");

        let template = self
            .env
            .get_template("index.html")
            .expect("index template must exist - added in constructor");

        template
            .render(context! {
                models => MODELS,
                nx_versions => NX_VERSIONS,
                min_tokens => MAX_TOKENS_RANGE.start(),
                max_tokens => MAX_TOKENS_RANGE.end(),
                accept => accept,
                extensions => config.allowed_extensions.join(", "),
            })
            .unwrap_or_else(|e| {
                tracing::error!("Failed to render page template: {}", e);
                "<!DOCTYPE html><title>NXGENIE</title><p>Page failed to render. See the server log.</p>"
                    .to_string()
            })
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_lists_options() {
        let html = Page::new().render(&Config::default());
        assert!(html.contains("<option value=\"gpt-4o-mini\">gpt-4o-mini</option>"));
        assert!(html.contains("<option value=\"NX 2406\">NX 2406</option>"));
        assert!(html.contains("accept=\".cs,.py,.txt\""));
        assert!(html.contains("max=\"8192\""));
    }
}
