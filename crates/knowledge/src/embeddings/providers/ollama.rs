//! Ollama Embedding Provider
//!
//! Provides embeddings via Ollama's local API using models like nomic-embed-text.
//! Ollama has no batch endpoint, so batches are embedded sequentially.

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use callsight_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const SERVICE: &str = "ollama";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBEDDING_ENDPOINT: &str = "/api/embeddings";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Request payload for Ollama embeddings API
#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Response from Ollama embeddings API
#[derive(Debug, Clone, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

/// Error response from Ollama API
#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Ollama embedding provider using local API
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OllamaProvider {
    /// Create a provider against the default local runtime.
    ///
    /// `OLLAMA_URL` overrides the default base URL.
    pub fn new(model: impl Into<String>, dimensions: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());

        let base_url =
            std::env::var("OLLAMA_URL").unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string());

        Self {
            client,
            base_url,
            model: model.into(),
            dimensions,
        }
    }

    /// Point the provider at a different base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn embed_single(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);

        let response = self
            .client
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, None, e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let detail = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error)
                .unwrap_or(error_text);

            return Err(AppError::upstream(SERVICE, Some(status.as_u16()), detail));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::malformed(SERVICE, e.to_string()))?;

        let embedding = body
            .embedding
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::malformed(SERVICE, "response is missing an embedding vector"))?;

        if embedding.len() != self.dimensions {
            return Err(AppError::malformed(
                SERVICE,
                format!(
                    "unexpected embedding dimensions: got {}, expected {}",
                    embedding.len(),
                    self.dimensions
                ),
            ));
        }

        debug!("Generated {} dimensional embedding", embedding.len());
        Ok(embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        SERVICE
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "ollama", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed_single(text).await?);
        }
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(server: &mockito::Server) -> OllamaProvider {
        OllamaProvider::new("nomic-embed-text", 3).with_base_url(server.url())
    }

    #[tokio::test]
    async fn test_embed_single() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/embeddings")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"model":"nomic-embed-text","prompt":"Hello"}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"embedding":[0.1,0.2,0.3]}"#)
            .create_async()
            .await;

        let embedding = provider(&server).embed("Hello").await.unwrap();

        mock.assert_async().await;
        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_error_body_is_unwrapped() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/embeddings")
            .with_status(404)
            .with_body(r#"{"error":"model 'nomic-embed-text' not found"}"#)
            .create_async()
            .await;

        let err = provider(&server).embed("Hello").await.unwrap_err();
        match err {
            AppError::Upstream { status, detail, .. } => {
                assert_eq!(status, Some(404));
                assert!(detail.contains("not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_embedding_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/embeddings")
            .with_status(200)
            .with_body(r#"{}"#)
            .create_async()
            .await;

        let err = provider(&server).embed("Hello").await.unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_batch_is_sequential_and_ordered() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/embeddings")
            .with_status(200)
            .with_body(r#"{"embedding":[1.0,0.0,0.0]}"#)
            .expect(2)
            .create_async()
            .await;

        let vectors = provider(&server)
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(vectors.len(), 2);
    }
}
