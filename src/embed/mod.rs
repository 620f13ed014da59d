//! Embedding generation
//!
//! This module provides an abstraction over embedding backends with:
//! - A trait the pipeline depends on, so tests can substitute a fake
//! - An HTTP backend for the Generative Language embedContent API
//! - A timeout-bounded helper used by ingestion and query

mod http_backend;

pub use http_backend::*;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// What the text being embedded will be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedTask {
    /// A chunk stored for retrieval
    Document,
    /// A question used to search stored chunks
    Query,
}

impl EmbedTask {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            EmbedTask::Document => "RETRIEVAL_DOCUMENT",
            EmbedTask::Query => "RETRIEVAL_QUERY",
        }
    }
}

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str, task: EmbedTask) -> Result<Vec<f32>>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    let embedder = HttpEmbedder::new(config)?;
    Ok(Box::new(embedder))
}

/// Embed `text`, failing with `EmbeddingUnavailable` if the call errors or
/// does not finish within `timeout`.
pub async fn embed_with_timeout(
    embedder: &dyn Embedder,
    text: &str,
    task: EmbedTask,
    timeout: Duration,
) -> Result<Vec<f32>> {
    match tokio::time::timeout(timeout, embedder.embed(text, task)).await {
        Ok(Ok(vector)) if vector.is_empty() => Err(Error::EmbeddingUnavailable(format!(
            "model '{}' returned an empty vector",
            embedder.model_name()
        ))),
        Ok(Ok(vector)) => Ok(vector),
        Ok(Err(Error::EmbeddingUnavailable(msg))) => Err(Error::EmbeddingUnavailable(msg)),
        Ok(Err(e)) => Err(Error::EmbeddingUnavailable(e.to_string())),
        Err(_) => Err(Error::EmbeddingUnavailable(format!(
            "model '{}' timed out after {:?}",
            embedder.model_name(),
            timeout
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowEmbedder;

    #[async_trait]
    impl Embedder for SlowEmbedder {
        async fn embed(&self, _text: &str, _task: EmbedTask) -> Result<Vec<f32>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![1.0])
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str, _task: EmbedTask) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_timeout_maps_to_embedding_unavailable() {
        let result =
            embed_with_timeout(&SlowEmbedder, "text", EmbedTask::Query, Duration::from_millis(20))
                .await;
        assert!(matches!(result, Err(Error::EmbeddingUnavailable(_))));
    }

    #[tokio::test]
    async fn test_empty_vector_rejected() {
        let result = embed_with_timeout(
            &FixedEmbedder(Vec::new()),
            "text",
            EmbedTask::Document,
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(result, Err(Error::EmbeddingUnavailable(_))));
    }

    #[tokio::test]
    async fn test_vector_passes_through() {
        let vector = embed_with_timeout(
            &FixedEmbedder(vec![0.5, 0.5]),
            "text",
            EmbedTask::Document,
            Duration::from_secs(1),
        )
        .await
        .unwrap();
        assert_eq!(vector, vec![0.5, 0.5]);
    }

    #[test]
    fn test_task_api_names() {
        assert_eq!(EmbedTask::Document.as_api_str(), "RETRIEVAL_DOCUMENT");
        assert_eq!(EmbedTask::Query.as_api_str(), "RETRIEVAL_QUERY");
    }
}
