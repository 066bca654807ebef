//! Context builder.
//!
//! Summarizes retrieved matches into a bounded text block: fixed-size
//! statistics, a capped sample, and the selected column names.

use crate::types::{CallMetadata, Column, SimilarityMatch};
use serde::Serialize;

/// Rendered when a query returns nothing.
pub const NO_MATCHES_CONTEXT: &str = "No similar call logs found.";

/// Number of match snapshots included verbatim.
pub const SAMPLE_SIZE: usize = 5;

const UNKNOWN_CLOSING: &str = "Unknown";

/// Statistics over a non-empty match set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextSummary {
    pub total: usize,
    /// Rounded mean of `call_time_phone`, missing values counted as 0
    pub average_duration: i64,
    /// Closing method counts in first-seen order
    pub closing_methods: Vec<(String, usize)>,
    pub sample: Vec<CallMetadata>,
}

impl ContextSummary {
    /// Summarize matches; `None` for an empty set.
    pub fn from_matches(matches: &[SimilarityMatch]) -> Option<Self> {
        if matches.is_empty() {
            return None;
        }

        let total = matches.len();
        // i128 holds any sum of i64 durations without overflow
        let sum: i128 = matches
            .iter()
            .map(|m| i128::from(m.metadata.call_time_phone.unwrap_or(0)))
            .sum();
        let average_duration = (sum as f64 / total as f64).round() as i64;

        let mut closing_methods: Vec<(String, usize)> = Vec::new();
        for m in matches {
            let method = m
                .metadata
                .form_closing
                .as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or(UNKNOWN_CLOSING);

            match closing_methods.iter_mut().find(|(name, _)| name == method) {
                Some((_, count)) => *count += 1,
                None => closing_methods.push((method.to_string(), 1)),
            }
        }

        let sample = matches
            .iter()
            .take(SAMPLE_SIZE)
            .map(|m| m.metadata.clone())
            .collect();

        Some(Self {
            total,
            average_duration,
            closing_methods,
            sample,
        })
    }

    fn render(&self, columns: &[Column]) -> String {
        let distribution = self
            .closing_methods
            .iter()
            .map(|(method, count)| format!("{}: {} calls", method, count))
            .collect::<Vec<_>>()
            .join(", ");

        let sample = serde_json::to_string_pretty(&self.sample).unwrap_or_default();

        let columns = columns
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "Here is the analysis of the most relevant call logs based on the user's question:\n\
             \n\
             Summary of relevant calls:\n\
             - Total relevant calls analyzed: {}\n\
             - Average call duration: {} seconds\n\
             - Closing methods distribution: {}\n\
             \n\
             Sample of relevant call logs:\n\
             {}\n\
             \n\
             The data shown above represents the most relevant call logs based on the user's question.\n\
             Available columns for analysis: {}",
            self.total, self.average_duration, distribution, sample, columns
        )
    }
}

/// Build the context block for a set of matches.
///
/// The block size depends only on the sample cap and column list, never on
/// the number of matches.
pub fn build_context(matches: &[SimilarityMatch], columns: &[Column]) -> String {
    match ContextSummary::from_matches(matches) {
        Some(summary) => summary.render(columns),
        None => NO_MATCHES_CONTEXT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::parse_records;
    use crate::types::DEFAULT_COLUMNS;

    fn hit(record_id: i64, duration: Option<i64>, closing: Option<&str>) -> SimilarityMatch {
        SimilarityMatch {
            record_id,
            similarity: 0.9,
            metadata: CallMetadata {
                teleq_id: Some(record_id),
                call_time_phone: duration,
                form_closing: closing.map(str::to_string),
                ..CallMetadata::default()
            },
        }
    }

    #[test]
    fn test_empty_matches_render_fixed_text() {
        assert_eq!(build_context(&[], &DEFAULT_COLUMNS), "No similar call logs found.");
        assert!(ContextSummary::from_matches(&[]).is_none());
    }

    #[test]
    fn test_average_duration() {
        let matches = vec![
            hit(1, Some(100), None),
            hit(2, Some(200), None),
            hit(3, Some(300), None),
        ];
        let summary = ContextSummary::from_matches(&matches).unwrap();
        assert_eq!(summary.average_duration, 200);

        let text = build_context(&matches, &DEFAULT_COLUMNS);
        assert!(text.contains("- Average call duration: 200 seconds"));
        assert!(text.contains("- Total relevant calls analyzed: 3"));
    }

    #[test]
    fn test_missing_durations_count_as_zero_and_round() {
        let matches = vec![hit(1, Some(3), None), hit(2, None, None), hit(3, Some(2), None)];
        // (3 + 0 + 2) / 3 = 1.67
        assert_eq!(
            ContextSummary::from_matches(&matches).unwrap().average_duration,
            2
        );
    }

    #[test]
    fn test_extreme_durations_do_not_overflow() {
        let matches = vec![hit(1, Some(i64::MAX), None), hit(2, Some(i64::MAX), None)];
        assert_eq!(
            ContextSummary::from_matches(&matches).unwrap().average_duration,
            i64::MAX
        );

        let mixed = vec![hit(1, Some(-i64::MAX), None), hit(2, Some(i64::MAX), None)];
        assert_eq!(
            ContextSummary::from_matches(&mixed).unwrap().average_duration,
            0
        );
    }

    #[test]
    fn test_imported_huge_durations_render() {
        let logs = parse_records(r#"[{"call_time_phone": 1e30}, {"call_time_phone": 1e30}]"#).unwrap();
        assert_eq!(logs[0].call_time_phone, Some(i64::MAX));

        let matches: Vec<_> = logs
            .iter()
            .enumerate()
            .map(|(i, log)| SimilarityMatch {
                record_id: i as i64,
                similarity: 0.8,
                metadata: log.metadata(),
            })
            .collect();

        let text = build_context(&matches, &DEFAULT_COLUMNS);
        assert!(text.contains(&format!("- Average call duration: {} seconds", i64::MAX)));
    }

    #[test]
    fn test_histogram_order_and_total() {
        let matches = vec![
            hit(1, None, Some("Callback")),
            hit(2, None, None),
            hit(3, None, Some("Resolved")),
            hit(4, None, Some("Callback")),
        ];
        let summary = ContextSummary::from_matches(&matches).unwrap();

        assert_eq!(
            summary.closing_methods,
            vec![
                ("Callback".to_string(), 2),
                ("Unknown".to_string(), 1),
                ("Resolved".to_string(), 1)
            ]
        );
        let counted: usize = summary.closing_methods.iter().map(|(_, c)| c).sum();
        assert_eq!(counted, matches.len());

        let text = build_context(&matches, &DEFAULT_COLUMNS);
        assert!(text.contains(
            "- Closing methods distribution: Callback: 2 calls, Unknown: 1 calls, Resolved: 1 calls"
        ));
    }

    #[test]
    fn test_sample_is_capped_and_size_bounded() {
        let few: Vec<_> = (0..6).map(|i| hit(i, Some(60), Some("Resolved"))).collect();
        let many: Vec<_> = (0..500).map(|i| hit(i % 6, Some(60), Some("Resolved"))).collect();

        let few_text = build_context(&few, &DEFAULT_COLUMNS);
        let many_text = build_context(&many, &DEFAULT_COLUMNS);

        assert_eq!(ContextSummary::from_matches(&many).unwrap().sample.len(), SAMPLE_SIZE);
        assert!(many_text.len() <= few_text.len() + 16);
    }

    #[test]
    fn test_lists_selected_columns() {
        let text = build_context(
            &[hit(1, Some(10), None)],
            &[Column::Category, Column::SmsSent],
        );
        assert!(text.ends_with("Available columns for analysis: category, sms_sent"));
    }
}
