//! System prompt assembly.

use minijinja::{Environment, context};

const SYSTEM_TEMPLATE: &str = r#"You are an expert assistant in NXOpen (Python) for Siemens NX.
Always use and respect the official NXOpen Python documentation when reasoning:
{{ doc_url }}

Act as a reviewer and improver of journals/code: clean, documented, robust, and ready for integration.
Compatibility target: **{{ nx_version }}**. Avoid using APIs or namespaces incompatible with that version.

Remove any user movements that were recorded in the journal from the code.

{% if instructions %}PERMANENT INSTRUCTIONS TO FOLLOW:
{{ instructions }}

{% endif %}Recommended response format:
1) Brief summary of what the code does.
2) List of issues/improvements.
3) Proposed code (a single block with the complete code, including imports/using if applicable).
4) Integration notes for NX.
"#;

/// Renders the system instruction sent first on every turn.
pub struct PromptBuilder {
    env: Environment<'static>,
    doc_url: String,
}

impl PromptBuilder {
    #[must_use]
    pub fn new(doc_url: impl Into<String>) -> Self {
        let mut env = Environment::new();
        env.add_template("system", SYSTEM_TEMPLATE)
            .expect("SYSTEM_TEMPLATE must be valid minijinja syntax");

        Self {
            env,
            doc_url: doc_url.into(),
        }
    }

    /// Build the system prompt. The instructions section is left out when
    /// `persistent_context` is blank; `nx_version` is quoted verbatim.
    #[must_use]
    pub fn build(&self, persistent_context: &str, nx_version: &str) -> String {
        let instructions = persistent_context.trim();
        let nx_version = nx_version.trim();

        let template = self
            .env
            .get_template("system")
            .expect("system template must exist - added in constructor");

        template
            .render(context! {
                doc_url => self.doc_url,
                nx_version => nx_version,
                instructions => (!instructions.is_empty()).then_some(instructions),
            })
            .unwrap_or_else(|e| {
                tracing::error!("Failed to render system prompt template: {}", e);
                format!(
                    "Review and improve NXOpen code. Compatibility target: **{nx_version}**.\n\n{instructions}"
                )
            })
    }
}
