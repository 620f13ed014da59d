//! SQLite schema definition

/// SQL schema for the chunk store and event log
pub const SCHEMA_SQL: &str = r#"
-- Chunks: retrievable text units with their embeddings
CREATE TABLE IF NOT EXISTS document_chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_type TEXT NOT NULL,
    source TEXT NOT NULL,
    chunk_text TEXT NOT NULL,
    embedding BLOB NOT NULL,
    dimension INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

-- Store-wide settings (the established embedding dimension)
CREATE TABLE IF NOT EXISTS store_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Interaction log: append-only audit trail
CREATE TABLE IF NOT EXISTS interaction_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    event_type TEXT NOT NULL,
    payload TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_source ON document_chunks(source);
CREATE INDEX IF NOT EXISTS idx_logs_type ON interaction_logs(event_type);
"#;

/// `store_meta` key holding the embedding dimension
pub const DIMENSION_KEY: &str = "embedding_dimension";
