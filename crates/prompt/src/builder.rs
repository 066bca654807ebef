//! System prompt assembly and template rendering.

use crate::types::PromptDefinition;
use callsight_core::{AppError, AppResult};
use handlebars::Handlebars;
use serde::Serialize;
use std::collections::HashMap;

/// Built-in system prompt for call-center analytics.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an analytics assistant specialized in analyzing call center data. Focus on providing insights about:
- Call durations and patterns
- SMS usage and engagement
- Digital identity verification rates
- Task types and closing methods
- Peak times and workload distribution
- Customer service efficiency metrics

When discussing metrics, always use concrete numbers and percentages. Structure your responses clearly and be concise.
Base your analysis only on the available data and highlight any notable trends or anomalies.";

/// Line that introduces the retrieved data inside the system message.
pub const CONTEXT_HEADER: &str = "Here's the relevant data to analyze:";

/// Append a data context to a system prompt.
///
/// The given prompt text is kept intact as a prefix of the result.
pub fn append_context(system_prompt: &str, context: &str) -> String {
    format!("{}\n\n{}\n{}", system_prompt, CONTEXT_HEADER, context)
}

/// Resolve the system prompt for a chat turn.
///
/// Without a definition this is [`DEFAULT_SYSTEM_PROMPT`]. A definition's
/// template is rendered with `variables` plus `defaultPrompt`.
pub fn build_system_prompt(
    definition: Option<&PromptDefinition>,
    mut variables: HashMap<String, String>,
) -> AppResult<String> {
    let Some(definition) = definition else {
        return Ok(DEFAULT_SYSTEM_PROMPT.to_string());
    };

    tracing::debug!("Building system prompt: {}", definition.id);

    variables
        .entry("defaultPrompt".to_string())
        .or_insert_with(|| DEFAULT_SYSTEM_PROMPT.to_string());

    let rendered = render_template(&definition.id, &definition.template, &variables)?;
    let rendered = rendered.trim();

    if rendered.is_empty() {
        return Err(AppError::Prompt(format!(
            "Prompt '{}' rendered to an empty system prompt",
            definition.id
        )));
    }

    Ok(rendered.to_string())
}

/// Render a Handlebars template against any serializable data.
///
/// HTML escaping is disabled; output is plain text for a model.
pub fn render_template<T: Serialize>(name: &str, template: &str, data: &T) -> AppResult<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string(name, template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render(name, data)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}
