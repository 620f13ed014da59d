//! Append-only interaction log
//!
//! Every ingestion and query leaves an immutable record here. Ingest events
//! are written inside the same transaction as the chunks they describe (see
//! [`crate::store::ChunkStore::append_batch`]). The retrieval path never
//! reads this table; [`EventLog::recent`] exists for post-hoc inspection.

use crate::error::{Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnection, SqlitePool};
use sqlx::FromRow;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Kinds of recorded events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PdfUpload,
    UrlIngest,
    TextIngest,
    IngestFailed,
    Question,
    QuestionFailed,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventType::PdfUpload => "pdf_upload",
            EventType::UrlIngest => "url_ingest",
            EventType::TextIngest => "text_ingest",
            EventType::IngestFailed => "ingest_failed",
            EventType::Question => "question",
            EventType::QuestionFailed => "question_failed",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for EventType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pdf_upload" => Ok(EventType::PdfUpload),
            "url_ingest" => Ok(EventType::UrlIngest),
            "text_ingest" => Ok(EventType::TextIngest),
            "ingest_failed" => Ok(EventType::IngestFailed),
            "question" => Ok(EventType::Question),
            "question_failed" => Ok(EventType::QuestionFailed),
            _ => Err(Error::Config(format!("Unknown event type: {}", s))),
        }
    }
}

/// An event waiting to be recorded
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub event_type: EventType,
    pub payload: serde_json::Value,
}

impl NewEvent {
    pub fn new(event_type: EventType, payload: serde_json::Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// A recorded event
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub event_type: String,
    pub payload: Option<String>,
    pub created_at: String,
}

impl Event {
    pub fn get_type(&self) -> Result<EventType> {
        self.event_type.parse()
    }

    pub fn payload_json(&self) -> Option<serde_json::Value> {
        self.payload
            .as_deref()
            .and_then(|p| serde_json::from_str(p).ok())
    }
}

/// Insert an event on an existing connection or transaction
pub(crate) async fn insert_event(conn: &mut SqliteConnection, event: &NewEvent) -> Result<i64> {
    let payload = serde_json::to_string(&event.payload)?;
    let result = sqlx::query(
        r#"
        INSERT INTO interaction_logs (event_type, payload, created_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(event.event_type.to_string())
    .bind(payload)
    .bind(Utc::now().to_rfc3339())
    .execute(conn)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Interaction log handle
#[derive(Clone)]
pub struct EventLog {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

impl EventLog {
    /// Shares the owning store's write lock so writers never interleave
    pub(crate) fn new(pool: SqlitePool, write_lock: Arc<Mutex<()>>) -> Self {
        Self { pool, write_lock }
    }

    /// Record a standalone event in its own transaction
    pub async fn record(&self, event_type: EventType, payload: serde_json::Value) -> Result<i64> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;
        let id = insert_event(&mut *tx, &NewEvent::new(event_type, payload)).await?;
        tx.commit().await?;
        Ok(id)
    }

    /// Most recent events, newest first
    pub async fn recent(&self, limit: usize) -> Result<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(
            "SELECT id, event_type, payload, created_at FROM interaction_logs ORDER BY id DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }
}
