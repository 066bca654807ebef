//! Stats command handler.
//!
//! Record and embedding counts plus accumulated token usage.

use crate::services;
use callsight_core::{config::AppConfig, AppResult};
use callsight_knowledge::RecordStore;
use clap::Args;

/// Show record counts and token usage
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let store = services::open_store(config)?;
        let stats = store.stats()?;
        let usage = services::usage_ledger(config).totals()?;

        if self.json {
            let output = serde_json::json!({
                "totalRecords": stats.total_records,
                "embeddedRecords": stats.embedded_records,
                "pendingRecords": stats.pending(),
                "usage": usage,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Call logs: {}", stats.total_records);
            println!("  Embedded: {}", stats.embedded_records);
            println!("  Pending: {}", stats.pending());

            if usage.is_empty() {
                println!("Token usage: (none recorded)");
            } else {
                println!("Token usage:");
                for model in &usage {
                    println!(
                        "  {}: {} calls, {} input / {} output tokens",
                        model.model, model.calls, model.input_tokens, model.output_tokens
                    );
                }
            }
        }

        Ok(())
    }
}
