//! Columns command handler.
//!
//! Shows or changes which call-log columns the model is told about.

use crate::services;
use callsight_core::{config::AppConfig, AppError, AppResult};
use callsight_knowledge::{parse_column_list, resolve_columns, AnalysisConfigStore, Column};
use clap::Args;

/// Show or change the columns available for analysis
#[derive(Args, Debug)]
pub struct ColumnsCommand {
    /// Comma-separated column names to select
    #[arg(long, value_name = "COLUMNS", conflicts_with = "reset")]
    pub set: Option<String>,

    /// Remove the selection and fall back to the default columns
    #[arg(long)]
    pub reset: bool,

    /// List every known column
    #[arg(long)]
    pub available: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ColumnsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing columns command");

        if self.available {
            return self.print(&Column::ALL, "Known columns");
        }

        let store = services::open_store(config)?;

        if let Some(list) = &self.set {
            let columns = validate_selection(list)?;
            store.save_selected_columns(&columns)?;
            return self.print(&columns, "Selected columns");
        }

        if self.reset {
            let existed = store.reset_selected_columns()?;
            if !existed {
                tracing::info!("No column selection stored, nothing to reset");
            }
            return self.print(&resolve_columns(None), "Selected columns (default)");
        }

        let stored = store.selected_columns()?;
        let label = if stored.is_some() {
            "Selected columns"
        } else {
            "Selected columns (default)"
        };
        self.print(&resolve_columns(stored), label)
    }

    fn print(&self, columns: &[Column], label: &str) -> AppResult<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(columns)?);
        } else {
            println!("{}:", label);
            for column in columns {
                println!("  {}", column);
            }
        }
        Ok(())
    }
}

/// Parse a `--set` value; unknown names and empty selections are rejected.
fn validate_selection(list: &str) -> AppResult<Vec<Column>> {
    let columns = parse_column_list(list).map_err(|unknown| {
        AppError::InvalidInput(format!(
            "Unknown columns: {}. Use --available to list known columns.",
            unknown.join(", ")
        ))
    })?;

    if columns.is_empty() {
        return Err(AppError::InvalidInput(
            "Select at least one column".to_string(),
        ));
    }

    Ok(columns)
}
