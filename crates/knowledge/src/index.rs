//! SQLite-backed record store, similarity index and analysis config.

use crate::store::{AnalysisConfigStore, RecordStore, SELECTED_COLUMNS_ID};
use crate::types::{
    format_timestamp, CallLog, CallMetadata, CallRecord, Column, EmbeddingEntry, IndexOutcome,
    SimilarityMatch, StoreStats,
};
use crate::vector_index::{cosine_similarity, rank_matches, SimilarityIndex};
use callsight_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS call_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    teleq_id INTEGER,
    unique_task_id TEXT,
    phone_no TEXT,
    number_pres TEXT,
    created TEXT,
    scheduled_time TEXT,
    closed TEXT,
    form_closing TEXT,
    first_contact TEXT,
    created_on TEXT,
    created_by TEXT,
    category TEXT,
    first_user_id TEXT,
    last_user_id TEXT,
    call_time_phone INTEGER,
    call_time_video INTEGER,
    customer_number TEXT,
    sms_received INTEGER,
    sms_sent INTEGER,
    user_time TEXT,
    post_tag_code TEXT,
    type_of_task_closed TEXT,
    recordings INTEGER,
    first_offered_time TEXT,
    type_of_task_created TEXT,
    e_identification INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS call_log_embeddings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    call_log_id INTEGER NOT NULL UNIQUE REFERENCES call_logs(id) ON DELETE CASCADE,
    embedding BLOB NOT NULL,
    metadata TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS analysis_config (
    id TEXT PRIMARY KEY,
    selected_columns TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// SQLite store implementing [`RecordStore`], [`SimilarityIndex`] and
/// [`AnalysisConfigStore`] over one database file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Store(format!("Failed to open {:?}: {}", db_path, e)))?;

        tracing::debug!("Opened record store at {:?}", db_path);
        Self::init(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Store(format!("Failed to open in-memory store: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| AppError::Store(format!("Failed to enable foreign keys: {}", e)))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| AppError::Store(format!("Failed to create tables: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Store("Store connection lock poisoned".to_string()))
    }

    /// Fetch the embedding stored for a record.
    pub fn get_embedding(&self, record_id: i64) -> AppResult<Option<EmbeddingEntry>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT embedding, metadata, created_at FROM call_log_embeddings WHERE call_log_id = ?1",
                params![record_id],
                |row| {
                    Ok((
                        row.get::<_, Vec<u8>>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| AppError::Store(format!("Failed to read embedding: {}", e)))?;

        let Some((bytes, metadata_json, created_at)) = row else {
            return Ok(None);
        };

        Ok(Some(EmbeddingEntry {
            record_id,
            vector: bytes_to_embedding(&bytes)?,
            metadata: serde_json::from_str(&metadata_json)?,
            created_at: parse_timestamp(Some(created_at)).unwrap_or_else(Utc::now),
        }))
    }
}

fn column_list() -> String {
    Column::ALL
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|t| t.with_timezone(&Utc))
}

fn timestamp_param(value: &Option<DateTime<Utc>>) -> Option<String> {
    value.as_ref().map(format_timestamp)
}

/// Map a `SELECT id, <Column::ALL>` row.
fn row_to_record(row: &Row<'_>) -> rusqlite::Result<CallRecord> {
    Ok(CallRecord {
        id: row.get(0)?,
        log: CallLog {
            teleq_id: row.get(1)?,
            unique_task_id: row.get(2)?,
            phone_no: row.get(3)?,
            number_pres: row.get(4)?,
            created: parse_timestamp(row.get(5)?),
            scheduled_time: parse_timestamp(row.get(6)?),
            closed: parse_timestamp(row.get(7)?),
            form_closing: row.get(8)?,
            first_contact: parse_timestamp(row.get(9)?),
            created_on: parse_timestamp(row.get(10)?),
            created_by: row.get(11)?,
            category: row.get(12)?,
            first_user_id: row.get(13)?,
            last_user_id: row.get(14)?,
            call_time_phone: row.get(15)?,
            call_time_video: row.get(16)?,
            customer_number: row.get(17)?,
            sms_received: row.get(18)?,
            sms_sent: row.get(19)?,
            user_time: row.get(20)?,
            post_tag_code: row.get(21)?,
            type_of_task_closed: row.get(22)?,
            recordings: row.get(23)?,
            first_offered_time: parse_timestamp(row.get(24)?),
            type_of_task_created: row.get(25)?,
            e_identification: row.get(26)?,
        },
    })
}

impl RecordStore for SqliteStore {
    fn insert_records(&self, records: &[CallLog]) -> AppResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Store(format!("Failed to begin import: {}", e)))?;

        let placeholders = (1..=Column::ALL.len() + 1)
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO call_logs ({}, created_at) VALUES ({})",
            column_list(),
            placeholders
        );
        let now = format_timestamp(&Utc::now());

        {
            let mut stmt = tx
                .prepare(&sql)
                .map_err(|e| AppError::Store(format!("Failed to prepare insert: {}", e)))?;

            for log in records {
                stmt.execute(params![
                    log.teleq_id,
                    log.unique_task_id,
                    log.phone_no,
                    log.number_pres,
                    timestamp_param(&log.created),
                    timestamp_param(&log.scheduled_time),
                    timestamp_param(&log.closed),
                    log.form_closing,
                    timestamp_param(&log.first_contact),
                    timestamp_param(&log.created_on),
                    log.created_by,
                    log.category,
                    log.first_user_id,
                    log.last_user_id,
                    log.call_time_phone,
                    log.call_time_video,
                    log.customer_number,
                    log.sms_received,
                    log.sms_sent,
                    log.user_time,
                    log.post_tag_code,
                    log.type_of_task_closed,
                    log.recordings,
                    timestamp_param(&log.first_offered_time),
                    log.type_of_task_created,
                    log.e_identification,
                    now,
                ])
                .map_err(|e| AppError::Store(format!("Failed to insert record: {}", e)))?;
            }
        }

        tx.commit()
            .map_err(|e| AppError::Store(format!("Failed to commit import: {}", e)))?;

        tracing::info!("Inserted {} call log records", records.len());
        Ok(records.len())
    }

    fn records_without_embeddings(
        &self,
        limit: usize,
        after_id: Option<i64>,
    ) -> AppResult<Vec<CallRecord>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT id, {} FROM call_logs c \
             WHERE c.id > ?1 \
             AND NOT EXISTS (SELECT 1 FROM call_log_embeddings e WHERE e.call_log_id = c.id) \
             ORDER BY c.id LIMIT ?2",
            column_list()
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| AppError::Store(format!("Failed to prepare candidate query: {}", e)))?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map(params![after_id.unwrap_or(i64::MIN), limit], row_to_record)
            .map_err(|e| AppError::Store(format!("Failed to query candidates: {}", e)))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| AppError::Store(format!("Failed to read candidate row: {}", e)))?;

        tracing::debug!("Found {} records without embeddings", records.len());
        Ok(records)
    }

    fn delete_records(&self, ids: &[i64]) -> AppResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Store(format!("Failed to begin delete: {}", e)))?;

        let mut deleted = 0;
        for id in ids {
            deleted += tx
                .execute("DELETE FROM call_logs WHERE id = ?1", params![id])
                .map_err(|e| AppError::Store(format!("Failed to delete record {}: {}", id, e)))?;
        }

        tx.commit()
            .map_err(|e| AppError::Store(format!("Failed to commit delete: {}", e)))?;

        tracing::info!("Deleted {} call log records", deleted);
        Ok(deleted)
    }

    fn stats(&self) -> AppResult<StoreStats> {
        let conn = self.lock()?;
        let count = |table: &str| -> AppResult<usize> {
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|v| v as usize)
            .map_err(|e| AppError::Store(format!("Failed to count {}: {}", table, e)))
        };

        Ok(StoreStats {
            total_records: count("call_logs")?,
            embedded_records: count("call_log_embeddings")?,
        })
    }
}

impl SimilarityIndex for SqliteStore {
    fn query(&self, vector: &[f32], threshold: f32, k: usize) -> AppResult<Vec<SimilarityMatch>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT call_log_id, embedding, metadata FROM call_log_embeddings")
            .map_err(|e| AppError::Store(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Vec<u8>>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| AppError::Store(format!("Failed to query embeddings: {}", e)))?;

        let mut scored = Vec::new();
        for row in rows {
            let (record_id, bytes, metadata_json) =
                row.map_err(|e| AppError::Store(format!("Failed to read embedding row: {}", e)))?;

            let embedding = match bytes_to_embedding(&bytes) {
                Ok(embedding) if embedding.len() == vector.len() => embedding,
                Ok(embedding) => {
                    tracing::debug!(
                        record_id,
                        stored = embedding.len(),
                        query = vector.len(),
                        "Skipping embedding with mismatched dimensions"
                    );
                    continue;
                }
                Err(e) => {
                    tracing::warn!(record_id, "Skipping unreadable embedding: {}", e);
                    continue;
                }
            };

            let metadata: CallMetadata = match serde_json::from_str(&metadata_json) {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!(record_id, "Skipping embedding with bad metadata: {}", e);
                    continue;
                }
            };

            scored.push(SimilarityMatch {
                record_id,
                similarity: cosine_similarity(vector, &embedding),
                metadata,
            });
        }

        let scanned = scored.len();
        let matches = rank_matches(scored, threshold, k);

        tracing::debug!(
            scanned,
            returned = matches.len(),
            threshold,
            k,
            "Similarity query complete"
        );

        Ok(matches)
    }

    fn index(
        &self,
        record_id: i64,
        vector: &[f32],
        metadata: &CallMetadata,
    ) -> AppResult<IndexOutcome> {
        let metadata_json = serde_json::to_string(metadata)?;
        let conn = self.lock()?;

        let changed = conn
            .execute(
                "INSERT INTO call_log_embeddings (call_log_id, embedding, metadata, created_at) \
                 VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT(call_log_id) DO NOTHING",
                params![
                    record_id,
                    embedding_to_bytes(vector),
                    metadata_json,
                    format_timestamp(&Utc::now()),
                ],
            )
            .map_err(|e| {
                AppError::Store(format!("Failed to store embedding for {}: {}", record_id, e))
            })?;

        Ok(if changed == 0 {
            IndexOutcome::AlreadyExists
        } else {
            IndexOutcome::Inserted
        })
    }

    fn embedded_count(&self) -> AppResult<usize> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM call_log_embeddings", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|v| v as usize)
        .map_err(|e| AppError::Store(format!("Failed to count embeddings: {}", e)))
    }
}

impl AnalysisConfigStore for SqliteStore {
    fn selected_columns(&self) -> AppResult<Option<Vec<String>>> {
        let conn = self.lock()?;
        let stored: Option<String> = conn
            .query_row(
                "SELECT selected_columns FROM analysis_config WHERE id = ?1",
                params![SELECTED_COLUMNS_ID],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AppError::Store(format!("Failed to read analysis config: {}", e)))?;

        match stored {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save_selected_columns(&self, columns: &[Column]) -> AppResult<()> {
        let names: Vec<&str> = columns.iter().map(|c| c.as_str()).collect();
        let json = serde_json::to_string(&names)?;
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO analysis_config (id, selected_columns, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(id) DO UPDATE SET selected_columns = excluded.selected_columns, \
             updated_at = excluded.updated_at",
            params![SELECTED_COLUMNS_ID, json, format_timestamp(&Utc::now())],
        )
        .map_err(|e| AppError::Store(format!("Failed to save analysis config: {}", e)))?;

        tracing::info!("Saved {} selected columns", columns.len());
        Ok(())
    }

    fn reset_selected_columns(&self) -> AppResult<bool> {
        let conn = self.lock()?;
        let removed = conn
            .execute(
                "DELETE FROM analysis_config WHERE id = ?1",
                params![SELECTED_COLUMNS_ID],
            )
            .map_err(|e| AppError::Store(format!("Failed to reset analysis config: {}", e)))?;
        Ok(removed > 0)
    }
}

/// Convert embedding vector to little-endian bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert stored bytes back to an embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Store("Invalid embedding bytes length".to_string()));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
