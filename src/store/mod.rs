//! Chunk storage using SQLite
//!
//! The chunk store is append-only: each chunk is written once with its
//! embedding and never updated or deleted. The first successful append fixes
//! the embedding dimension for the lifetime of the store.
//!
//! Writes are serialized per store and each one runs in its own transaction,
//! so a reader either sees a chunk with both text and vector or not at all.
//! The write lock is only taken around the transaction itself; callers embed
//! text before calling in.

mod schema;

pub use schema::*;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{insert_event, EventLog, NewEvent};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// How long a writer waits for another connection's write lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Identifier assigned to a chunk on insertion; increases with insertion order
pub type ChunkId = i64;

/// Origin category of a chunk
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum SourceType {
    Pdf,
    Web,
    Text,
    Other(String),
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Pdf => write!(f, "pdf"),
            SourceType::Web => write!(f, "web"),
            SourceType::Text => write!(f, "text"),
            SourceType::Other(tag) => write!(f, "{}", tag),
        }
    }
}

impl FromStr for SourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let tag = s.trim().to_lowercase();
        match tag.as_str() {
            "" => Err(Error::Config("Source type must not be empty".to_string())),
            "pdf" => Ok(SourceType::Pdf),
            "web" => Ok(SourceType::Web),
            "text" => Ok(SourceType::Text),
            _ => Ok(SourceType::Other(tag)),
        }
    }
}

impl From<SourceType> for String {
    fn from(value: SourceType) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for SourceType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// A stored chunk
#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub source_type: SourceType,
    pub source: String,
    pub text: String,
    pub vector: Vec<f32>,
    pub created_at: String,
}

/// A chunk waiting to be appended
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub source_type: SourceType,
    pub source: String,
    pub text: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, FromRow)]
struct ChunkRow {
    id: i64,
    source_type: String,
    source: String,
    chunk_text: String,
    embedding: Vec<u8>,
    dimension: i64,
    created_at: String,
}

impl TryFrom<ChunkRow> for Chunk {
    type Error = Error;

    fn try_from(row: ChunkRow) -> Result<Self> {
        let vector = decode_vector(&row.embedding, row.dimension as usize)?;
        Ok(Chunk {
            id: row.id,
            source_type: row.source_type.parse()?,
            source: row.source,
            text: row.chunk_text,
            vector,
            created_at: row.created_at,
        })
    }
}

/// Chunk store handle
#[derive(Clone)]
pub struct ChunkStore {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

impl ChunkStore {
    /// Connect to the store configured in `config`
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::open(&config.paths.db_file).await
    }

    /// Open (creating if needed) the store at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        };

        if !store.is_initialized().await? {
            store.init_schema().await?;
        }

        Ok(store)
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing database schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Check if database is initialized
    pub async fn is_initialized(&self) -> Result<bool> {
        let result: Option<(i32,)> = sqlx::query_as(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='document_chunks'",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(result.is_some())
    }

    /// Event log sharing this store's database
    pub fn events(&self) -> EventLog {
        EventLog::new(self.pool.clone(), Arc::clone(&self.write_lock))
    }

    /// Append one chunk in its own transaction
    pub async fn append(
        &self,
        source_type: SourceType,
        source: &str,
        text: &str,
        vector: Vec<f32>,
    ) -> Result<ChunkId> {
        let chunk = NewChunk {
            source_type,
            source: source.to_string(),
            text: text.to_string(),
            vector,
        };
        let ids = self.append_batch(std::slice::from_ref(&chunk), None).await?;
        Ok(ids[0])
    }

    /// Append chunks and an optional event as one atomic unit
    ///
    /// Either every chunk and the event are committed, or nothing is.
    pub async fn append_batch(
        &self,
        chunks: &[NewChunk],
        event: Option<&NewEvent>,
    ) -> Result<Vec<ChunkId>> {
        let dimension = validate_batch(chunks)?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        // Write before any read: the write lock is taken up front, so writers
        // in other processes queue on the busy timeout.
        let claimed = sqlx::query("INSERT OR IGNORE INTO store_meta (key, value) VALUES (?, ?)")
            .bind(DIMENSION_KEY)
            .bind(dimension.to_string())
            .execute(&mut *tx)
            .await?;
        if claimed.rows_affected() == 1 {
            info!(dimension, "Establishing embedding dimension for store");
        }

        let established: String =
            sqlx::query_scalar("SELECT value FROM store_meta WHERE key = ?")
                .bind(DIMENSION_KEY)
                .fetch_one(&mut *tx)
                .await?;
        let expected: usize = established.parse().map_err(|_| {
            Error::Config(format!("Corrupt stored embedding dimension: {}", established))
        })?;
        if expected != dimension {
            return Err(Error::DimensionMismatch {
                expected,
                actual: dimension,
            });
        }

        let now = Utc::now().to_rfc3339();
        let mut ids = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let result = sqlx::query(
                r#"
                INSERT INTO document_chunks (source_type, source, chunk_text, embedding, dimension, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(chunk.source_type.to_string())
            .bind(&chunk.source)
            .bind(&chunk.text)
            .bind(encode_vector(&chunk.vector))
            .bind(dimension as i64)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
            ids.push(result.last_insert_rowid());
        }

        if let Some(event) = event {
            insert_event(&mut *tx, event).await?;
        }

        tx.commit().await?;
        debug!(count = ids.len(), "Committed chunk batch");
        Ok(ids)
    }

    /// Point-in-time snapshot of every chunk, in insertion order
    pub async fn all(&self) -> Result<Vec<Chunk>> {
        let rows = sqlx::query_as::<_, ChunkRow>(
            "SELECT id, source_type, source, chunk_text, embedding, dimension, created_at FROM document_chunks ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Chunk::try_from).collect()
    }

    /// Number of stored chunks
    pub async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM document_chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    /// Embedding dimension fixed by the first append, if any
    pub async fn dimension(&self) -> Result<Option<usize>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM store_meta WHERE key = ?")
                .bind(DIMENSION_KEY)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value.and_then(|v| v.parse().ok()))
    }

    /// Distinct sources with their chunk counts
    pub async fn list_sources(&self) -> Result<Vec<SourceSummary>> {
        let sources = sqlx::query_as::<_, SourceSummary>(
            r#"
            SELECT source_type, source, COUNT(*) AS chunk_count, MIN(created_at) AS first_ingested
            FROM document_chunks
            GROUP BY source_type, source
            ORDER BY MIN(id)
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(sources)
    }
}

/// Per-source chunk statistics
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SourceSummary {
    pub source_type: String,
    pub source: String,
    pub chunk_count: i64,
    pub first_ingested: String,
}

/// Check a batch before taking the write lock; returns its dimension
fn validate_batch(chunks: &[NewChunk]) -> Result<usize> {
    let first = chunks
        .first()
        .ok_or_else(|| Error::NoChunksProduced("empty batch".to_string()))?;
    let dimension = first.vector.len();
    if dimension == 0 {
        return Err(Error::InvalidVector("vector has no components".to_string()));
    }

    for chunk in chunks {
        if chunk.text.trim().is_empty() {
            return Err(Error::EmptyText);
        }
        if chunk.vector.len() != dimension {
            return Err(Error::DimensionMismatch {
                expected: dimension,
                actual: chunk.vector.len(),
            });
        }
        if chunk.vector.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidVector(
                "vector contains non-finite components".to_string(),
            ));
        }
    }

    Ok(dimension)
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(std::mem::size_of_val(vector));
    for &value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn decode_vector(blob: &[u8], dimension: usize) -> Result<Vec<f32>> {
    if blob.len() != dimension * std::mem::size_of::<f32>() {
        return Err(Error::InvalidVector(format!(
            "stored embedding has {} bytes, expected {}",
            blob.len(),
            dimension * std::mem::size_of::<f32>()
        )));
    }

    Ok(blob
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
