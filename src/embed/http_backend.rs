use super::{EmbedTask, Embedder};
use crate::api_backend::ApiClient;
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'static str,
}

#[derive(Debug, Clone, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Clone, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum EmbeddingResponse {
    Single { embedding: EmbeddingValues },
    Embeddings { embeddings: Vec<Vec<f32>> },
    Data { data: Vec<EmbeddingData> },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum EmbeddingValues {
    Values { values: Vec<f32> },
    Raw(Vec<f32>),
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl EmbeddingResponse {
    fn into_vector(self) -> Option<Vec<f32>> {
        match self {
            EmbeddingResponse::Single {
                embedding: EmbeddingValues::Values { values },
            } => Some(values),
            EmbeddingResponse::Single {
                embedding: EmbeddingValues::Raw(values),
            } => Some(values),
            EmbeddingResponse::Embeddings { embeddings } => embeddings.into_iter().next(),
            EmbeddingResponse::Data { data } => data.into_iter().next().map(|d| d.embedding),
        }
    }
}

/// Embedder backed by the hosted `embedContent` endpoint
pub struct HttpEmbedder {
    client: ApiClient,
    model_id: String,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = ApiClient::new(
            &config.url,
            config.api_key(),
            config.timeout(),
            config.retries,
        )?;
        Ok(Self {
            client,
            model_id: config.model.clone(),
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str, task: EmbedTask) -> Result<Vec<f32>> {
        let url = self.client.model_endpoint(&self.model_id, "embedContent")?;
        let request = EmbedContentRequest {
            model: &self.model_id,
            content: Content {
                parts: vec![Part { text }],
            },
            task_type: task.as_api_str(),
        };

        let parsed: EmbeddingResponse = self
            .client
            .post_json(url, &request)
            .await
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;

        let vector = parsed.into_vector().unwrap_or_default();
        debug!(model = %self.model_id, dimension = vector.len(), "Embedded text");
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> EmbeddingConfig {
        EmbeddingConfig {
            url: format!("{}/v1beta/", server.uri()),
            model: "models/embedding-001".to_string(),
            api_key_env: String::new(),
            timeout_secs: 5,
            retries: 0,
        }
    }

    #[tokio::test]
    async fn test_embed_content_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/embedding-001:embedContent"))
            .and(body_partial_json(serde_json::json!({
                "taskType": "RETRIEVAL_QUERY",
                "content": { "parts": [{ "text": "hello" }] }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": { "values": [0.1, 0.2, 0.3] }
            })))
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(&config_for(&server)).unwrap();
        let vector = embedder.embed("hello", EmbedTask::Query).await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_alternate_response_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/embedding-001:embedContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "embedding": [1.0, 0.0] }]
            })))
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(&config_for(&server)).unwrap();
        let vector = embedder.embed("hi", EmbedTask::Document).await.unwrap();
        assert_eq!(vector, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_api_key_sent_as_query_param() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/embedding-001:embedContent"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": { "values": [1.0] }
            })))
            .mount(&server)
            .await;

        let config = config_for(&server);
        let client = ApiClient::new(
            &config.url,
            Some("test-key".to_string()),
            config.timeout(),
            0,
        )
        .unwrap();
        let embedder = HttpEmbedder {
            client,
            model_id: config.model.clone(),
        };
        assert_eq!(embedder.embed("x", EmbedTask::Document).await.unwrap(), vec![1.0]);
    }

    #[tokio::test]
    async fn test_server_error_is_embedding_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(&config_for(&server)).unwrap();
        let result = embedder.embed("hello", EmbedTask::Document).await;
        assert!(matches!(result, Err(Error::EmbeddingUnavailable(_))));
    }
}
