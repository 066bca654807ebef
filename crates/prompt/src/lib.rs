//! Prompt system for Callsight.
//!
//! This crate owns the system prompt used by the chat pipeline:
//! - The built-in analytics prompt (`DEFAULT_SYSTEM_PROMPT`)
//! - YAML prompt definitions under `.callsight/prompts/`
//! - Handlebars template rendering
//! - Appending a retrieved data context to a system message

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{
    append_context, build_system_prompt, render_template, CONTEXT_HEADER, DEFAULT_SYSTEM_PROMPT,
};
pub use loader::{list_prompts, load_prompt};
pub use types::PromptDefinition;
