//! Call-log import from CSV exports, JSON or JSON-lines files.
//!
//! Field parsing is lenient: unparseable integers and timestamps become
//! absent, and `e_identification` is true only for a literal `true`.

use crate::store::RecordStore;
use crate::types::{CallLog, Column};
use callsight_core::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use std::path::Path;

/// Layout of an import file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    /// JSON array, or one JSON object per line
    Json,
    /// Header row, then one record per row in [`Column::ALL`] order
    Csv,
}

impl ImportFormat {
    /// `.csv` files are CSV; anything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ImportFormat::Csv,
            _ => ImportFormat::Json,
        }
    }

    pub fn parse(self, content: &str) -> AppResult<Vec<CallLog>> {
        match self {
            ImportFormat::Json => parse_records(content),
            ImportFormat::Csv => parse_csv_records(content),
        }
    }
}

/// Parse records from a JSON array or one JSON object per line.
pub fn parse_records(content: &str) -> AppResult<Vec<CallLog>> {
    let trimmed = content.trim_start();

    let values: Vec<(usize, Value)> = if trimmed.starts_with('[') {
        let array: Vec<Value> = serde_json::from_str(trimmed)
            .map_err(|e| AppError::InvalidInput(format!("Invalid JSON array: {}", e)))?;
        array.into_iter().enumerate().map(|(i, v)| (i + 1, v)).collect()
    } else {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line)
                    .map(|v| (i + 1, v))
                    .map_err(|e| AppError::InvalidInput(format!("Line {}: invalid JSON: {}", i + 1, e)))
            })
            .collect::<AppResult<_>>()?
    };

    values
        .into_iter()
        .map(|(position, value)| match value {
            Value::Object(fields) => Ok(record_from_fields(&fields)),
            _ => Err(AppError::InvalidInput(format!(
                "Record {} is not a JSON object",
                position
            ))),
        })
        .collect()
}

/// Parse a CSV export.
///
/// The first row is a header and is skipped whatever it contains. Cells map
/// by position onto [`Column::ALL`]; short rows leave trailing fields absent
/// and extra cells are ignored.
pub fn parse_csv_records(content: &str) -> AppResult<Vec<CallLog>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    reader
        .records()
        .map(|row| {
            let row = row.map_err(|e| {
                let line = e.position().map(|p| p.line()).unwrap_or_default();
                AppError::InvalidInput(format!("Line {}: invalid CSV: {}", line, e))
            })?;

            let fields: Map<String, Value> = Column::ALL
                .iter()
                .zip(row.iter())
                .map(|(column, cell)| (column.as_str().to_string(), Value::String(cell.to_string())))
                .collect();

            Ok(record_from_fields(&fields))
        })
        .collect()
}

/// Read, parse and insert a file in one transaction.
///
/// Without an explicit `format` the file extension decides.
pub fn import_file(
    store: &dyn RecordStore,
    path: &Path,
    format: Option<ImportFormat>,
) -> AppResult<usize> {
    let format = format.unwrap_or_else(|| ImportFormat::from_path(path));
    let content = std::fs::read_to_string(path)?;
    let records = format.parse(&content)?;

    tracing::info!(?format, "Parsed {} call log records from {:?}", records.len(), path);

    if records.is_empty() {
        return Ok(0);
    }
    store.insert_records(&records)
}

fn record_from_fields(fields: &Map<String, Value>) -> CallLog {
    CallLog {
        teleq_id: integer(fields, "teleq_id"),
        unique_task_id: text(fields, "unique_task_id"),
        phone_no: text(fields, "phone_no"),
        number_pres: text(fields, "number_pres"),
        created: timestamp(fields, "created"),
        scheduled_time: timestamp(fields, "scheduled_time"),
        closed: timestamp(fields, "closed"),
        form_closing: text(fields, "form_closing"),
        first_contact: timestamp(fields, "first_contact"),
        created_on: timestamp(fields, "created_on"),
        created_by: text(fields, "created_by"),
        category: text(fields, "category"),
        first_user_id: text(fields, "first_user_id"),
        last_user_id: text(fields, "last_user_id"),
        call_time_phone: integer(fields, "call_time_phone"),
        call_time_video: integer(fields, "call_time_video"),
        customer_number: text(fields, "customer_number"),
        sms_received: integer(fields, "sms_received"),
        sms_sent: integer(fields, "sms_sent"),
        user_time: text(fields, "user_time"),
        post_tag_code: text(fields, "post_tag_code"),
        type_of_task_closed: text(fields, "type_of_task_closed"),
        recordings: integer(fields, "recordings"),
        first_offered_time: timestamp(fields, "first_offered_time"),
        type_of_task_created: text(fields, "type_of_task_created"),
        e_identification: matches!(
            fields.get("e_identification"),
            Some(Value::Bool(true))
        ) || matches!(fields.get("e_identification"), Some(Value::String(s)) if s == "true"),
    }
}

fn text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn integer(fields: &Map<String, Value>, key: &str) -> Option<i64> {
    match fields.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => parse_leading_int(s),
        _ => None,
    }
}

/// Integer prefix of a string (`"42 sec"` is 42); `None` without digits.
fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|v| sign * v)
}

fn timestamp(fields: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    match fields.get(key)? {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => n
            .as_i64()
            .filter(|y| (1000..=9999).contains(y))
            .and_then(|y| Utc.with_ymd_and_hms(y as i32, 1, 1, 0, 0, 0).single()),
        _ => None,
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD[ HH:MM:SS]`, or a bare year.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if value.len() == 4 && value.chars().all(|c| c.is_ascii_digit()) {
        let year: i32 = value.parse().ok()?;
        return Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single();
    }

    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Some(t.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(value, format) {
            return Some(t.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SqliteStore;
    use tempfile::TempDir;

    #[test]
    fn test_parse_timestamp_formats() {
        let year = parse_timestamp("2023").unwrap();
        assert_eq!(year, Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());

        let date = parse_timestamp("2024-02-29").unwrap();
        assert_eq!(date, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());

        let rfc = parse_timestamp("2024-03-01T10:15:00+01:00").unwrap();
        assert_eq!(rfc, Utc.with_ymd_and_hms(2024, 3, 1, 9, 15, 0).unwrap());

        let spaced = parse_timestamp("2024-03-01 10:15:00").unwrap();
        assert_eq!(spaced, Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap());

        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_leading_int() {
        assert_eq!(parse_leading_int("42"), Some(42));
        assert_eq!(parse_leading_int(" 42 sec"), Some(42));
        assert_eq!(parse_leading_int("-7"), Some(-7));
        assert_eq!(parse_leading_int("abc"), None);
        assert_eq!(parse_leading_int(""), None);
    }

    #[test]
    fn test_parse_json_array() {
        let content = r#"[
            {"teleq_id": "1001", "category": "Billing", "call_time_phone": 185,
             "created": "2024", "e_identification": "true", "form_closing": ""},
            {"teleq_id": 1002, "call_time_phone": "n/a", "e_identification": "TRUE",
             "user_time": 35}
        ]"#;

        let records = parse_records(content).unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].teleq_id, Some(1001));
        assert_eq!(records[0].call_time_phone, Some(185));
        assert_eq!(
            records[0].created,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert!(records[0].e_identification);
        assert_eq!(records[0].form_closing, None);

        assert_eq!(records[1].call_time_phone, None);
        assert!(!records[1].e_identification);
        assert_eq!(records[1].user_time.as_deref(), Some("35"));
    }

    #[test]
    fn test_parse_json_lines() {
        let content = "{\"teleq_id\": 1, \"e_identification\": true}\n\n{\"teleq_id\": 2}\n";
        let records = parse_records(content).unwrap();

        assert_eq!(records.len(), 2);
        assert!(records[0].e_identification);
        assert_eq!(records[1].teleq_id, Some(2));
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        assert!(matches!(
            parse_records("[1, 2]"),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_records("{\"teleq_id\": 1}\nnot json"),
            Err(AppError::InvalidInput(msg)) if msg.starts_with("Line 2")
        ));
    }

    #[test]
    fn test_import_file_is_all_or_nothing() {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::open_in_memory().unwrap();

        let bad = temp.path().join("bad.jsonl");
        std::fs::write(&bad, "{\"teleq_id\": 1}\n[\"oops\"]\n").unwrap();
        assert!(import_file(&store, &bad, None).is_err());
        assert_eq!(store.stats().unwrap().total_records, 0);

        let good = temp.path().join("good.json");
        std::fs::write(&good, r#"[{"teleq_id": 1}, {"teleq_id": 2}]"#).unwrap();
        assert_eq!(import_file(&store, &good, None).unwrap(), 2);
        assert_eq!(store.stats().unwrap().total_records, 2);
    }

    const CSV_HEADER: &str = "TeleQ ID,Unique Task ID,Phone No,Number Pres,Created,Scheduled Time,\
Closed,Form Closing,First Contact,Created On,Created By,Category,First User,Last User,\
Call Time Phone,Call Time Video,Customer Number,SMS Received,SMS Sent,User Time,Post Tag Code,\
Type Of Task Closed,Recordings,First Offered Time,Type Of Task Created,E-Identification";

    #[test]
    fn test_parse_csv_export() {
        let content = format!(
            "{}\n\
             1001,T-1,+4670000,hidden,2023,,2024-03-01 10:15:00,Resolved,,,agent7,Billing,,,185 sec,,,0,2,00:03:05,,Closed,1,,Incoming,true\n\
             1002,,,,,,,,,,,Passport,,,,,,,,,,,,,,TRUE\n",
            CSV_HEADER
        );

        let records = parse_csv_records(&content).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.teleq_id, Some(1001));
        assert_eq!(first.unique_task_id.as_deref(), Some("T-1"));
        assert_eq!(
            first.created,
            Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(first.scheduled_time, None);
        assert_eq!(
            first.closed,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap())
        );
        assert_eq!(first.form_closing.as_deref(), Some("Resolved"));
        assert_eq!(first.category.as_deref(), Some("Billing"));
        assert_eq!(first.call_time_phone, Some(185));
        assert_eq!(first.sms_received, Some(0));
        assert_eq!(first.sms_sent, Some(2));
        assert_eq!(first.user_time.as_deref(), Some("00:03:05"));
        assert_eq!(first.recordings, Some(1));
        assert_eq!(first.type_of_task_created.as_deref(), Some("Incoming"));
        assert!(first.e_identification);

        let second = &records[1];
        assert_eq!(second.teleq_id, Some(1002));
        assert_eq!(second.unique_task_id, None);
        assert_eq!(second.created, None);
        assert_eq!(second.call_time_phone, None);
        assert_eq!(second.category.as_deref(), Some("Passport"));
        assert!(!second.e_identification);
    }

    #[test]
    fn test_csv_header_only_and_short_rows() {
        assert!(parse_csv_records(CSV_HEADER).unwrap().is_empty());

        let records = parse_csv_records("id,unique\n7,task-7\n").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].teleq_id, Some(7));
        assert_eq!(records[0].unique_task_id.as_deref(), Some("task-7"));
        assert_eq!(records[0].category, None);
        assert!(!records[0].e_identification);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ImportFormat::from_path(Path::new("calls.csv")), ImportFormat::Csv);
        assert_eq!(ImportFormat::from_path(Path::new("calls.CSV")), ImportFormat::Csv);
        assert_eq!(ImportFormat::from_path(Path::new("calls.jsonl")), ImportFormat::Json);
        assert_eq!(ImportFormat::from_path(Path::new("calls")), ImportFormat::Json);
    }

    #[test]
    fn test_import_csv_file() {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::open_in_memory().unwrap();

        let path = temp.path().join("export.csv");
        std::fs::write(&path, format!("{}\n1,a\n2,b\n3,c\n", CSV_HEADER)).unwrap();
        assert_eq!(import_file(&store, &path, None).unwrap(), 3);

        let renamed = temp.path().join("export.txt");
        std::fs::write(&renamed, "header\n4\n").unwrap();
        assert_eq!(import_file(&store, &renamed, Some(ImportFormat::Csv)).unwrap(), 1);
        assert_eq!(store.stats().unwrap().total_records, 4);
    }
}
