//! Append-only token usage ledger (JSON lines).

use callsight_core::AppResult;
use callsight_llm::TokenUsage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub usage: TokenUsage,
}

/// Summed usage for one model.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelUsage {
    pub model: String,
    pub calls: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

pub struct UsageLedger {
    path: PathBuf,
}

impl UsageLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record one completion call.
    pub fn append(&self, usage: &TokenUsage) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let entry = UsageEntry {
            timestamp: Utc::now(),
            usage: usage.clone(),
        };
        let line = serde_json::to_string(&entry)?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;

        Ok(())
    }

    /// All entries; unreadable lines are skipped. A missing ledger is empty.
    pub fn entries(&self) -> AppResult<Vec<UsageEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let mut entries = Vec::new();
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<UsageEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!("Skipping usage ledger line {}: {}", i + 1, e),
            }
        }
        Ok(entries)
    }

    /// Totals per model, sorted by model name.
    pub fn totals(&self) -> AppResult<Vec<ModelUsage>> {
        let mut by_model: BTreeMap<String, ModelUsage> = BTreeMap::new();
        for entry in self.entries()? {
            let totals = by_model
                .entry(entry.usage.model.clone())
                .or_insert_with(|| ModelUsage {
                    model: entry.usage.model.clone(),
                    ..ModelUsage::default()
                });
            totals.calls += 1;
            totals.input_tokens += entry.usage.input_tokens as u64;
            totals.output_tokens += entry.usage.output_tokens as u64;
        }
        Ok(by_model.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_ledger_is_empty() {
        let temp = TempDir::new().unwrap();
        let ledger = UsageLedger::new(temp.path().join("usage.jsonl"));
        assert!(ledger.entries().unwrap().is_empty());
        assert!(ledger.totals().unwrap().is_empty());
    }

    #[test]
    fn test_append_and_totals() {
        let temp = TempDir::new().unwrap();
        let ledger = UsageLedger::new(temp.path().join("nested").join("usage.jsonl"));

        ledger.append(&TokenUsage::new("sonnet", 100, 20)).unwrap();
        ledger.append(&TokenUsage::new("haiku", 10, 5)).unwrap();
        ledger.append(&TokenUsage::new("sonnet", 50, 30)).unwrap();

        assert_eq!(ledger.entries().unwrap().len(), 3);

        let totals = ledger.totals().unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].model, "haiku");
        assert_eq!(totals[1].model, "sonnet");
        assert_eq!(totals[1].calls, 2);
        assert_eq!(totals[1].input_tokens, 150);
        assert_eq!(totals[1].output_tokens, 50);
    }

    #[test]
    fn test_corrupt_lines_are_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("usage.jsonl");
        let ledger = UsageLedger::new(&path);

        ledger.append(&TokenUsage::new("sonnet", 1, 1)).unwrap();
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{not json").unwrap();

        assert_eq!(ledger.entries().unwrap().len(), 1);
    }
}
