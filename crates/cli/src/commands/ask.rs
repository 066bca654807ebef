//! Ask command handler.
//!
//! Runs one chat turn against the call-log knowledge base.

use crate::services;
use callsight_core::{config::AppConfig, AppError, AppResult};
use callsight_llm::ChatMessage;
use callsight_prompt::{build_system_prompt, load_prompt};
use clap::Args;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Ask a question about the imported call logs
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long, conflicts_with = "question")]
    pub file: Option<PathBuf>,

    /// Prior conversation as a JSON array of {role, content} messages
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Prompt definition ID from .callsight/prompts/
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Template variable for the prompt definition (key=value)
    #[arg(long = "var", value_parser = parse_variable)]
    pub variables: Vec<(String, String)>,

    /// Maximum tokens in response
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        config.validate()?;

        let question = self
            .get_question()?
            .ok_or_else(|| AppError::InvalidInput("No question provided".to_string()))?;

        let mut conversation = match &self.history {
            Some(path) => load_history(path)?,
            None => Vec::new(),
        };
        conversation.push(ChatMessage::user(question));

        let system_prompt = self.system_prompt(config)?;

        let mut completion = config.completion.clone();
        if let Some(max_tokens) = self.max_tokens {
            completion.max_tokens = max_tokens;
        }

        let store = services::open_store(config)?;
        let orchestrator = services::orchestrator(config, &store, &completion)?;
        let response = orchestrator.converse(&conversation, &system_prompt).await?;

        if let Err(e) = services::usage_ledger(config).append(&response.usage) {
            tracing::warn!("Failed to record token usage: {}", e);
        }

        if self.json {
            let output = serde_json::json!({
                "answer": response.text,
                "model": response.usage.model,
                "provider": completion.provider,
                "usage": {
                    "inputTokens": response.usage.input_tokens,
                    "outputTokens": response.usage.output_tokens,
                    "totalTokens": response.usage.total()
                },
                "metadata": {
                    "promptId": self.prompt,
                    "contextMatches": response.context_matches
                }
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", response.text);

            tracing::debug!(
                "Token usage - Input: {}, Output: {}, Total: {}",
                response.usage.input_tokens,
                response.usage.output_tokens,
                response.usage.total()
            );
        }

        Ok(())
    }

    fn system_prompt(&self, config: &AppConfig) -> AppResult<String> {
        let definition = match &self.prompt {
            Some(id) => Some(load_prompt(&config.workspace, id)?),
            None => None,
        };
        let variables: HashMap<String, String> = self.variables.iter().cloned().collect();
        build_system_prompt(definition.as_ref(), variables)
    }

    /// Get the question text from the argument or file.
    fn get_question(&self) -> AppResult<Option<String>> {
        if let Some(question) = &self.question {
            return Ok(Some(question.clone()));
        }
        match &self.file {
            Some(path) => Ok(Some(std::fs::read_to_string(path)?)),
            None => Ok(None),
        }
    }
}

fn load_history(path: &Path) -> AppResult<Vec<ChatMessage>> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| {
        AppError::InvalidInput(format!("Invalid conversation history in {:?}: {}", path, e))
    })
}

fn parse_variable(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    if key.trim().is_empty() {
        return Err(format!("empty variable name in '{}'", s));
    }
    Ok((key.trim().to_string(), value.to_string()))
}
