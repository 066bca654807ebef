//! Record store and analysis-config abstractions.

use crate::types::{CallLog, CallRecord, Column, StoreStats, DEFAULT_COLUMNS};
use callsight_core::AppResult;

/// Fixed key of the selected-columns configuration row.
pub const SELECTED_COLUMNS_ID: &str = "selected_columns";

/// Call-log persistence.
pub trait RecordStore: Send + Sync {
    /// Insert records in a single transaction; all or nothing.
    fn insert_records(&self, records: &[CallLog]) -> AppResult<usize>;

    /// Records without an embedding, ascending id, strictly after `after_id`.
    fn records_without_embeddings(
        &self,
        limit: usize,
        after_id: Option<i64>,
    ) -> AppResult<Vec<CallRecord>>;

    /// Delete records by id; their embeddings go with them.
    fn delete_records(&self, ids: &[i64]) -> AppResult<usize>;

    /// Record and embedding counts.
    fn stats(&self) -> AppResult<StoreStats>;
}

/// Persisted column selection.
pub trait AnalysisConfigStore: Send + Sync {
    /// Raw stored column names, `None` when no row exists.
    fn selected_columns(&self) -> AppResult<Option<Vec<String>>>;

    /// Overwrite the selection.
    fn save_selected_columns(&self, columns: &[Column]) -> AppResult<()>;

    /// Remove the selection; returns whether a row existed.
    fn reset_selected_columns(&self) -> AppResult<bool>;
}

/// Turn stored names into columns.
///
/// Unknown names are dropped with a warning. An absent or fully invalid
/// selection yields [`DEFAULT_COLUMNS`].
pub fn resolve_columns(stored: Option<Vec<String>>) -> Vec<Column> {
    let Some(names) = stored else {
        return DEFAULT_COLUMNS.to_vec();
    };

    let mut columns = Vec::with_capacity(names.len());
    for name in &names {
        match Column::parse(name) {
            Some(column) if !columns.contains(&column) => columns.push(column),
            Some(_) => {}
            None => tracing::warn!(column = %name, "Ignoring unknown column in analysis config"),
        }
    }

    if columns.is_empty() {
        tracing::warn!("Analysis config selects no known columns, using defaults");
        return DEFAULT_COLUMNS.to_vec();
    }

    columns
}

/// Parse a comma-separated list of column names, rejecting unknown ones.
pub fn parse_column_list(input: &str) -> Result<Vec<Column>, Vec<String>> {
    let mut columns = Vec::new();
    let mut unknown = Vec::new();

    for name in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match Column::parse(name) {
            Some(column) if !columns.contains(&column) => columns.push(column),
            Some(_) => {}
            None => unknown.push(name.to_string()),
        }
    }

    if unknown.is_empty() {
        Ok(columns)
    } else {
        Err(unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_absent_is_default() {
        assert_eq!(resolve_columns(None), DEFAULT_COLUMNS.to_vec());
    }

    #[test]
    fn test_resolve_drops_unknown_and_duplicates() {
        let stored = vec![
            "category".to_string(),
            "secret_notes".to_string(),
            "sms_sent".to_string(),
            "category".to_string(),
        ];
        assert_eq!(
            resolve_columns(Some(stored)),
            vec![Column::Category, Column::SmsSent]
        );
    }

    #[test]
    fn test_resolve_all_unknown_is_default() {
        let stored = vec!["nope".to_string()];
        assert_eq!(resolve_columns(Some(stored)), DEFAULT_COLUMNS.to_vec());
    }

    #[test]
    fn test_parse_column_list() {
        assert_eq!(
            parse_column_list("teleq_id, category ,sms_sent"),
            Ok(vec![Column::TeleqId, Column::Category, Column::SmsSent])
        );
        assert_eq!(
            parse_column_list("teleq_id,bogus"),
            Err(vec!["bogus".to_string()])
        );
    }
}
