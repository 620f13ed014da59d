//! Custom error types for docqa

use thiserror::Error;

/// Main error type for docqa operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Source unreadable: {0}")]
    SourceUnreadable(String),

    #[error("Chunk text is empty")]
    EmptyText,

    #[error("No chunks produced from source: {0}")]
    NoChunksProduced(String),

    #[error("Embedding dimension mismatch: store uses {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Not initialized: run 'docqa init' first")]
    NotInitialized,
}

impl Error {
    /// Short machine-readable kind, used in failure events
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::Database(_) => "database",
            Error::SourceUnreadable(_) => "source_unreadable",
            Error::EmptyText => "empty_text",
            Error::NoChunksProduced(_) => "no_chunks_produced",
            Error::DimensionMismatch { .. } => "dimension_mismatch",
            Error::EmbeddingUnavailable(_) => "embedding_unavailable",
            Error::InvalidVector(_) => "invalid_vector",
            Error::Io(_) => "io",
            Error::Http(_) => "http",
            Error::UrlParse(_) => "url_parse",
            Error::Json(_) => "json",
            Error::TomlParse(_) | Error::TomlSerialize(_) => "toml",
            Error::NotInitialized => "not_initialized",
        }
    }
}

/// Result type alias for docqa
pub type Result<T> = std::result::Result<T, Error>;
