//! Call-log domain types.
//!
//! Records are typed at the store boundary; nothing past this module passes
//! untyped rows around.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A known call-log column.
///
/// Selected-column configuration is validated against this fixed schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    TeleqId,
    UniqueTaskId,
    PhoneNo,
    NumberPres,
    Created,
    ScheduledTime,
    Closed,
    FormClosing,
    FirstContact,
    CreatedOn,
    CreatedBy,
    Category,
    FirstUserId,
    LastUserId,
    CallTimePhone,
    CallTimeVideo,
    CustomerNumber,
    SmsReceived,
    SmsSent,
    UserTime,
    PostTagCode,
    TypeOfTaskClosed,
    Recordings,
    FirstOfferedTime,
    TypeOfTaskCreated,
    EIdentification,
}

impl Column {
    /// Every column, in table order.
    pub const ALL: [Column; 26] = [
        Column::TeleqId,
        Column::UniqueTaskId,
        Column::PhoneNo,
        Column::NumberPres,
        Column::Created,
        Column::ScheduledTime,
        Column::Closed,
        Column::FormClosing,
        Column::FirstContact,
        Column::CreatedOn,
        Column::CreatedBy,
        Column::Category,
        Column::FirstUserId,
        Column::LastUserId,
        Column::CallTimePhone,
        Column::CallTimeVideo,
        Column::CustomerNumber,
        Column::SmsReceived,
        Column::SmsSent,
        Column::UserTime,
        Column::PostTagCode,
        Column::TypeOfTaskClosed,
        Column::Recordings,
        Column::FirstOfferedTime,
        Column::TypeOfTaskCreated,
        Column::EIdentification,
    ];

    /// Column name as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            Column::TeleqId => "teleq_id",
            Column::UniqueTaskId => "unique_task_id",
            Column::PhoneNo => "phone_no",
            Column::NumberPres => "number_pres",
            Column::Created => "created",
            Column::ScheduledTime => "scheduled_time",
            Column::Closed => "closed",
            Column::FormClosing => "form_closing",
            Column::FirstContact => "first_contact",
            Column::CreatedOn => "created_on",
            Column::CreatedBy => "created_by",
            Column::Category => "category",
            Column::FirstUserId => "first_user_id",
            Column::LastUserId => "last_user_id",
            Column::CallTimePhone => "call_time_phone",
            Column::CallTimeVideo => "call_time_video",
            Column::CustomerNumber => "customer_number",
            Column::SmsReceived => "sms_received",
            Column::SmsSent => "sms_sent",
            Column::UserTime => "user_time",
            Column::PostTagCode => "post_tag_code",
            Column::TypeOfTaskClosed => "type_of_task_closed",
            Column::Recordings => "recordings",
            Column::FirstOfferedTime => "first_offered_time",
            Column::TypeOfTaskCreated => "type_of_task_created",
            Column::EIdentification => "e_identification",
        }
    }

    /// Parse a column name (trimmed, case-insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Column::ALL.iter().copied().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Columns used when no selection has been saved.
pub const DEFAULT_COLUMNS: [Column; 8] = [
    Column::TeleqId,
    Column::Created,
    Column::FormClosing,
    Column::Category,
    Column::CallTimePhone,
    Column::SmsSent,
    Column::TypeOfTaskClosed,
    Column::EIdentification,
];

/// Fields of one call-log row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallLog {
    pub teleq_id: Option<i64>,
    pub unique_task_id: Option<String>,
    pub phone_no: Option<String>,
    pub number_pres: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub closed: Option<DateTime<Utc>>,
    pub form_closing: Option<String>,
    pub first_contact: Option<DateTime<Utc>>,
    pub created_on: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub category: Option<String>,
    pub first_user_id: Option<String>,
    pub last_user_id: Option<String>,
    /// Phone time in seconds
    pub call_time_phone: Option<i64>,
    pub call_time_video: Option<i64>,
    pub customer_number: Option<String>,
    pub sms_received: Option<i64>,
    pub sms_sent: Option<i64>,
    pub user_time: Option<String>,
    pub post_tag_code: Option<String>,
    pub type_of_task_closed: Option<String>,
    pub recordings: Option<i64>,
    pub first_offered_time: Option<DateTime<Utc>>,
    pub type_of_task_created: Option<String>,
    #[serde(default)]
    pub e_identification: bool,
}

impl CallLog {
    /// Short, fixed-field text used as embedding input.
    pub fn projection_text(&self) -> String {
        let or_na = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".to_string());

        [
            format!(
                "Call ID: {}",
                self.teleq_id.map(|v| v.to_string()).unwrap_or_else(|| "N/A".to_string())
            ),
            format!("Category: {}", or_na(&self.category)),
            format!(
                "Created: {}",
                self.created.map(|t| format_timestamp(&t)).unwrap_or_else(|| "N/A".to_string())
            ),
            format!("Form Closing: {}", or_na(&self.form_closing)),
            format!("Call Duration: {} seconds", self.call_time_phone.unwrap_or(0)),
            format!("SMS Sent: {}", self.sms_sent.unwrap_or(0)),
            format!("Task Type: {}", or_na(&self.type_of_task_closed)),
            format!(
                "E-identification: {}",
                if self.e_identification { "Yes" } else { "No" }
            ),
        ]
        .join("\n")
    }

    /// Snapshot stored alongside the embedding.
    pub fn metadata(&self) -> CallMetadata {
        CallMetadata {
            teleq_id: self.teleq_id,
            category: self.category.clone(),
            created: self.created,
            form_closing: self.form_closing.clone(),
            call_time_phone: self.call_time_phone,
            sms_sent: self.sms_sent,
            type_of_task_closed: self.type_of_task_closed.clone(),
            e_identification: self.e_identification,
        }
    }
}

/// A stored call-log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub id: i64,
    pub log: CallLog,
}

/// Denormalized record snapshot captured at embedding time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallMetadata {
    pub teleq_id: Option<i64>,
    pub category: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub form_closing: Option<String>,
    pub call_time_phone: Option<i64>,
    pub sms_sent: Option<i64>,
    pub type_of_task_closed: Option<String>,
    #[serde(default)]
    pub e_identification: bool,
}

/// A persisted embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingEntry {
    pub record_id: i64,
    pub vector: Vec<f32>,
    pub metadata: CallMetadata,
    pub created_at: DateTime<Utc>,
}

/// One similarity query hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityMatch {
    pub record_id: i64,
    pub similarity: f32,
    pub metadata: CallMetadata,
}

/// Result of indexing one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    Inserted,
    AlreadyExists,
}

/// Aggregate counts from an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Records in the store when the run started
    pub total_records: usize,
    /// Records skipped because an embedding already existed
    pub already_embedded: usize,
    pub newly_processed: usize,
    pub failed: usize,
    /// Records still lacking an embedding after the run
    pub pending: usize,
}

/// Record and embedding counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_records: usize,
    pub embedded_records: usize,
}

impl StoreStats {
    pub fn pending(&self) -> usize {
        self.total_records.saturating_sub(self.embedded_records)
    }
}

/// Render a timestamp the way it is stored (`2024-03-01T09:30:00Z`).
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
