//! Ingest command implementation
//!
//! Ingestion is all-or-nothing per source: every chunk is embedded before
//! anything is written, then the chunks and their ingest event are committed
//! in one transaction. No store lock is held while the embedder is called.

use crate::chunk::{chunk_text, preview};
use crate::config::Config;
use crate::embed::{embed_with_timeout, EmbedTask, Embedder};
use crate::error::{Error, Result};
use crate::events::{EventType, NewEvent};
use crate::extract::{extract_pdf, WebFetcher};
use crate::progress::{abandon_progress, advance_progress, finish_progress, start_progress_bar};
use crate::store::{ChunkId, ChunkStore, NewChunk, SourceType};
use serde::Serialize;
use tracing::{debug, info, warn};

/// One source to ingest
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub source_type: SourceType,
    /// Filename or URL
    pub source: String,
    pub text: String,
    /// Extractor metadata, logged verbatim
    pub metadata: serde_json::Value,
}

impl IngestRequest {
    pub fn new(source_type: SourceType, source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_type,
            source: source.into(),
            text: text.into(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Ingestion statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestStats {
    pub source: String,
    pub stored_chunks: usize,
    pub chunk_ids: Vec<ChunkId>,
    pub dimension: usize,
}

/// Event type recorded for a successful ingest of `source_type`
fn success_event_type(source_type: &SourceType) -> EventType {
    match source_type {
        SourceType::Pdf => EventType::PdfUpload,
        SourceType::Web => EventType::UrlIngest,
        _ => EventType::TextIngest,
    }
}

/// Chunk, embed and persist one source
pub async fn cmd_ingest(
    config: &Config,
    store: &ChunkStore,
    embedder: &dyn Embedder,
    request: IngestRequest,
) -> Result<IngestStats> {
    info!(
        source = %request.source,
        source_type = %request.source_type,
        "Ingesting source"
    );

    match ingest_inner(config, store, embedder, &request).await {
        Ok(stats) => Ok(stats),
        Err(e) => {
            record_ingest_failure(store, &request.source_type, &request.source, &e).await;
            Err(e)
        }
    }
}

async fn ingest_inner(
    config: &Config,
    store: &ChunkStore,
    embedder: &dyn Embedder,
    request: &IngestRequest,
) -> Result<IngestStats> {
    if request.text.trim().is_empty() {
        return Err(Error::SourceUnreadable(format!(
            "No text extracted from {}",
            request.source
        )));
    }

    let texts = chunk_text(&request.text, config.chunk.max_chars);
    if texts.is_empty() {
        return Err(Error::NoChunksProduced(request.source.clone()));
    }
    debug!(chunks = texts.len(), "Chunked source text");

    let timeout = config.embedding.call_budget();
    let progress = start_progress_bar(texts.len(), "Embedding chunks");
    let mut chunks = Vec::with_capacity(texts.len());
    for text in &texts {
        let vector = match embed_with_timeout(embedder, text, EmbedTask::Document, timeout).await
        {
            Ok(vector) => vector,
            Err(e) => {
                abandon_progress(progress);
                return Err(e);
            }
        };
        chunks.push(NewChunk {
            source_type: request.source_type.clone(),
            source: request.source.clone(),
            text: text.clone(),
            vector,
        });
        advance_progress(&progress);
    }
    finish_progress(progress, "Chunks embedded");

    let dimension = chunks.first().map(|c| c.vector.len()).unwrap_or_default();
    let chunk_details: Vec<serde_json::Value> = texts
        .iter()
        .map(|t| {
            serde_json::json!({
                "length": t.chars().count(),
                "preview": preview(t),
            })
        })
        .collect();

    let event = NewEvent::new(
        success_event_type(&request.source_type),
        serde_json::json!({
            "source": request.source,
            "source_type": request.source_type.to_string(),
            "chunk_count": chunks.len(),
            "dimension": dimension,
            "metadata": request.metadata,
            "chunk_details": chunk_details,
        }),
    );

    let chunk_ids = store.append_batch(&chunks, Some(&event)).await?;
    info!(
        source = %request.source,
        stored = chunk_ids.len(),
        "Ingestion complete"
    );

    Ok(IngestStats {
        source: request.source.clone(),
        stored_chunks: chunk_ids.len(),
        chunk_ids,
        dimension,
    })
}

/// Extract a PDF and ingest its text
pub async fn cmd_ingest_pdf(
    config: &Config,
    store: &ChunkStore,
    embedder: &dyn Embedder,
    filename: &str,
    bytes: Vec<u8>,
) -> Result<IngestStats> {
    // pdf parsing is CPU-bound and may panic on malformed input
    let extracted = tokio::task::spawn_blocking(move || extract_pdf(&bytes))
        .await
        .unwrap_or_else(|e| Err(Error::SourceUnreadable(format!("PDF extraction aborted: {}", e))));

    let extracted = match extracted {
        Ok(extracted) => extracted,
        Err(e) => {
            record_ingest_failure(store, &SourceType::Pdf, filename, &e).await;
            return Err(e);
        }
    };

    let request = IngestRequest::new(SourceType::Pdf, filename, extracted.text)
        .with_metadata(extracted.metadata);
    cmd_ingest(config, store, embedder, request).await
}

/// Fetch a web page and ingest its visible text
pub async fn cmd_ingest_url(
    config: &Config,
    store: &ChunkStore,
    embedder: &dyn Embedder,
    url: &str,
    source_type: Option<SourceType>,
) -> Result<IngestStats> {
    let source_type = source_type.unwrap_or(SourceType::Web);
    let fetched = async {
        let fetcher = WebFetcher::new(&config.web)?;
        fetcher.fetch(url).await
    }
    .await;

    let extracted = match fetched {
        Ok(extracted) => extracted,
        Err(e) => {
            record_ingest_failure(store, &source_type, url, &e).await;
            return Err(e);
        }
    };

    let request =
        IngestRequest::new(source_type, url, extracted.text).with_metadata(extracted.metadata);
    cmd_ingest(config, store, embedder, request).await
}

/// Best-effort failure record; a logging failure never masks the real error
async fn record_ingest_failure(
    store: &ChunkStore,
    source_type: &SourceType,
    source: &str,
    error: &Error,
) {
    let payload = serde_json::json!({
        "source": source,
        "source_type": source_type.to_string(),
        "error_kind": error.kind(),
        "error": error.to_string(),
    });
    if let Err(log_err) = store.events().record(EventType::IngestFailed, payload).await {
        warn!("Failed to record ingest failure event: {}", log_err);
    }
}

/// Print ingestion results to console
pub fn print_ingest_stats(stats: &IngestStats) {
    println!("\n📚 Ingested {}", stats.source);
    println!("   Chunks stored: {}", stats.stored_chunks);
    println!("   Vector dimension: {}", stats.dimension);
    if let (Some(first), Some(last)) = (stats.chunk_ids.first(), stats.chunk_ids.last()) {
        println!("   Chunk ids: {}..={}", first, last);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::TempDir;

    /// Embeds text as (length, vowel count)
    struct ShapeEmbedder;

    #[async_trait]
    impl Embedder for ShapeEmbedder {
        async fn embed(&self, text: &str, _task: EmbedTask) -> Result<Vec<f32>> {
            let vowels = text.chars().filter(|c| "aeiou".contains(*c)).count();
            Ok(vec![text.len() as f32, vowels as f32 + 1.0])
        }

        fn model_name(&self) -> &str {
            "shape"
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str, _task: EmbedTask) -> Result<Vec<f32>> {
            Err(Error::EmbeddingUnavailable("backend down".to_string()))
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    async fn setup(max_chars: usize) -> (TempDir, Config, ChunkStore) {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.init_paths(Some(tmp.path().to_path_buf()));
        config.chunk.max_chars = max_chars;
        let store = ChunkStore::connect(&config).await.unwrap();
        (tmp, config, store)
    }

    #[tokio::test]
    async fn test_ingest_stores_chunks_and_event() {
        let (_tmp, config, store) = setup(10).await;
        let request = IngestRequest::new(SourceType::Text, "notes.txt", "abcdefghij klmnopqrst")
            .with_metadata(serde_json::json!({ "origin": "unit-test" }));

        let stats = cmd_ingest(&config, &store, &ShapeEmbedder, request)
            .await
            .unwrap();
        assert_eq!(stats.stored_chunks, 3);
        assert_eq!(stats.dimension, 2);
        assert_eq!(store.count().await.unwrap(), 3);

        let events = store.events().recent(10).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].get_type().unwrap(), EventType::TextIngest);
        let payload = events[0].payload_json().unwrap();
        assert_eq!(payload["chunk_count"], 3);
        assert_eq!(payload["metadata"]["origin"], "unit-test");
        assert_eq!(payload["chunk_details"][0]["length"], 10);
    }

    #[tokio::test]
    async fn test_blank_text_is_unreadable_and_logged() {
        let (_tmp, config, store) = setup(800).await;
        let request = IngestRequest::new(SourceType::Pdf, "blank.pdf", "  \n ");

        let result = cmd_ingest(&config, &store, &ShapeEmbedder, request).await;
        assert!(matches!(result, Err(Error::SourceUnreadable(_))));
        assert_eq!(store.count().await.unwrap(), 0);

        let events = store.events().recent(10).await.unwrap();
        assert_eq!(events[0].get_type().unwrap(), EventType::IngestFailed);
        assert_eq!(events[0].payload_json().unwrap()["error_kind"], "source_unreadable");
    }

    #[tokio::test]
    async fn test_embedding_failure_persists_nothing() {
        let (_tmp, config, store) = setup(5).await;
        let request = IngestRequest::new(SourceType::Web, "https://example.com", "many words here");

        let result = cmd_ingest(&config, &store, &FailingEmbedder, request).await;
        assert!(matches!(result, Err(Error::EmbeddingUnavailable(_))));
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(store.dimension().await.unwrap(), None);

        let events = store.events().recent(10).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].get_type().unwrap(), EventType::IngestFailed);
    }

    #[tokio::test]
    async fn test_unreadable_pdf_is_logged() {
        let (_tmp, config, store) = setup(800).await;
        let result =
            cmd_ingest_pdf(&config, &store, &ShapeEmbedder, "junk.pdf", b"not a pdf".to_vec())
                .await;

        assert!(matches!(result, Err(Error::SourceUnreadable(_))));
        let events = store.events().recent(10).await.unwrap();
        assert_eq!(events[0].payload_json().unwrap()["source"], "junk.pdf");
    }

    #[test]
    fn test_success_event_types() {
        assert_eq!(success_event_type(&SourceType::Pdf), EventType::PdfUpload);
        assert_eq!(success_event_type(&SourceType::Web), EventType::UrlIngest);
        assert_eq!(success_event_type(&SourceType::Text), EventType::TextIngest);
        assert_eq!(
            success_event_type(&SourceType::Other("wiki".to_string())),
            EventType::TextIngest
        );
    }
}
