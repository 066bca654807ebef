//! Prompts command handler.

use callsight_core::{config::AppConfig, AppResult};
use callsight_prompt::{list_prompts, load_prompt};
use clap::Args;

/// List prompt definitions in .callsight/prompts/
#[derive(Args, Debug)]
pub struct PromptsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PromptsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing prompts command");

        let ids = list_prompts(&config.workspace)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&ids)?);
            return Ok(());
        }

        if ids.is_empty() {
            println!("No prompt definitions found; the built-in analytics prompt is used.");
            return Ok(());
        }

        for id in &ids {
            match load_prompt(&config.workspace, id) {
                Ok(prompt) => println!("{}  {}", prompt.id, prompt.title),
                Err(e) => println!("{}  (invalid: {})", id, e),
            }
        }

        Ok(())
    }
}
