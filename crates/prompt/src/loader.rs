//! Prompt loader for YAML prompt definitions.

use crate::types::PromptDefinition;
use callsight_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

const PROMPTS_DIR: &str = ".callsight/prompts";

/// Load a prompt definition by ID from the workspace.
///
/// Looks for `<id>.yml` (then `<id>.yaml`) in `.callsight/prompts/`.
///
/// # Example
/// ```no_run
/// use callsight_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "analytics.sms")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    if prompt_id.is_empty() || prompt_id.contains(['/', '\\']) || prompt_id.starts_with('.') {
        return Err(AppError::Prompt(format!("Invalid prompt id: {:?}", prompt_id)));
    }

    let prompt_file = find_prompt_file(&workspace_path.join(PROMPTS_DIR), prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("Prompt not found: {}", prompt_id)))?;

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!("Failed to read prompt file {:?}: {}", prompt_file, e))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse prompt YAML {:?}: {}", prompt_file, e))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

fn find_prompt_file(prompts_dir: &Path, prompt_id: &str) -> Option<PathBuf> {
    ["yml", "yaml"]
        .iter()
        .map(|ext| prompts_dir.join(format!("{}.{}", prompt_id, ext)))
        .find(|path| path.is_file())
}

/// List all available prompt IDs in the workspace, sorted.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let prompts_dir = workspace_path.join(PROMPTS_DIR);

    if !prompts_dir.exists() {
        return Ok(Vec::new());
    }

    let mut prompt_ids = Vec::new();

    for entry in walkdir::WalkDir::new(&prompts_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        let is_yaml = matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("yml") | Some("yaml")
        );
        if path.is_file() && is_yaml {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                prompt_ids.push(stem.to_string());
            }
        }
    }

    prompt_ids.sort();
    prompt_ids.dedup();
    Ok(prompt_ids)
}

fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt("Prompt template cannot be empty".to_string()));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {:?}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}
