//! Import command handler.

use crate::services;
use callsight_core::{config::AppConfig, AppResult};
use callsight_knowledge::{import_file, ImportFormat};
use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// Import call logs from a CSV export, JSON array or JSON-lines file
#[derive(Args, Debug)]
pub struct ImportCommand {
    /// File to import
    pub file: PathBuf,

    /// File format (default: csv for .csv files, json otherwise)
    #[arg(long, value_enum)]
    pub format: Option<FileFormat>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum FileFormat {
    Csv,
    Json,
}

impl From<FileFormat> for ImportFormat {
    fn from(format: FileFormat) -> Self {
        match format {
            FileFormat::Csv => ImportFormat::Csv,
            FileFormat::Json => ImportFormat::Json,
        }
    }
}

impl ImportCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing import command for {:?}", self.file);

        let store = services::open_store(config)?;
        let imported = import_file(store.as_ref(), &self.file, self.format.map(Into::into))?;

        if self.json {
            let output = serde_json::json!({
                "file": self.file,
                "imported": imported,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Imported {} call logs from {}", imported, self.file.display());
            if imported > 0 {
                println!("Run 'callsight ingest --all' to embed them.");
            }
        }

        Ok(())
    }
}
