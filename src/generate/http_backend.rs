use super::{Generation, Generator};
use crate::api_backend::ApiClient;
use crate::config::GenerationConfig;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Clone, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Clone, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if any
    fn first_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        Some(text)
    }
}

/// Generator backed by the hosted `generateContent` endpoint
pub struct HttpGenerator {
    client: ApiClient,
    model_id: String,
}

impl HttpGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let client = ApiClient::new(&config.url, config.api_key(), config.timeout(), 0)?;
        Ok(Self {
            client,
            model_id: config.model.clone(),
        })
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(&self, prompt: &str) -> Generation {
        let url = match self.client.model_endpoint(&self.model_id, "generateContent") {
            Ok(url) => url,
            Err(e) => return Generation::Failed(e.to_string()),
        };
        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        match self
            .client
            .post_json::<_, GenerateContentResponse>(url, &request)
            .await
        {
            Ok(response) => match response.first_text() {
                Some(text) => {
                    debug!(model = %self.model_id, chars = text.len(), "Generated answer");
                    Generation::Text(text)
                }
                None => Generation::Failed("response contained no candidates".to_string()),
            },
            Err(e) => Generation::Failed(e.to_string()),
        }
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> GenerationConfig {
        GenerationConfig {
            url: format!("{}/v1beta", server.uri()),
            model: "models/gemini-test".to_string(),
            api_key_env: String::new(),
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_generate_joins_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "Paris " }, { "text": "is the capital." }] }
                }]
            })))
            .mount(&server)
            .await;

        let generator = HttpGenerator::new(&config_for(&server)).unwrap();
        let outcome = generator.generate("prompt").await;
        assert_eq!(outcome, Generation::Text("Paris is the capital.".to_string()));
    }

    #[tokio::test]
    async fn test_no_candidates_is_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "candidates": [] })),
            )
            .mount(&server)
            .await;

        let generator = HttpGenerator::new(&config_for(&server)).unwrap();
        assert!(matches!(generator.generate("prompt").await, Generation::Failed(_)));
    }

    #[tokio::test]
    async fn test_http_error_is_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let generator = HttpGenerator::new(&config_for(&server)).unwrap();
        assert!(matches!(generator.generate("prompt").await, Generation::Failed(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let generator = HttpGenerator::new(&config_for(&server)).unwrap();
        assert!(matches!(generator.generate("prompt").await, Generation::Failed(_)));
    }
}
