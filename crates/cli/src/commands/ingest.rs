//! Ingest command handler.
//!
//! Embeds call logs that do not have an embedding yet.

use crate::services;
use callsight_core::{config::AppConfig, AppResult};
use clap::Args;

/// Generate embeddings for call logs that lack one
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Keep processing batches until every pending record was attempted
    #[arg(long)]
    pub all: bool,

    /// Override the configured batch size
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command");

        let mut config = config.clone();
        if let Some(batch_size) = self.batch_size {
            config.ingest.batch_size = batch_size;
        }

        let store = services::open_store(&config)?;
        let job = services::ingestion_job(&config, &store)?;

        let report = if self.all {
            job.run_all().await?
        } else {
            job.run().await?
        };

        if self.json {
            let output = serde_json::json!({
                "totalRecords": report.total_records,
                "alreadyEmbedded": report.already_embedded,
                "newlyProcessed": report.newly_processed,
                "failed": report.failed,
                "pending": report.pending,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Embedded {} call logs ({} already embedded, {} failed, {} pending of {})",
                report.newly_processed,
                report.already_embedded,
                report.failed,
                report.pending,
                report.total_records
            );
        }

        Ok(())
    }
}
