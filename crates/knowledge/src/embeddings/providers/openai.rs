//! OpenAI embedding provider.
//!
//! OpenAI API: https://platform.openai.com/docs/api-reference/embeddings

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use callsight_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const SERVICE: &str = "openai";
const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
const EMBEDDING_ENDPOINT: &str = "/v1/embeddings";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Request payload for the embeddings API
#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// Response from the embeddings API
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    embedding: Vec<f32>,
}

/// OpenAI embedding provider (`text-embedding-3-small` by default).
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, dimensions: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: DEFAULT_OPENAI_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            dimensions,
        }
    }

    /// Point the provider at a different base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn check_vectors(&self, expected: usize, mut data: Vec<EmbeddingData>) -> AppResult<Vec<Vec<f32>>> {
        if data.len() != expected {
            return Err(AppError::malformed(
                SERVICE,
                format!("expected {} embeddings, got {}", expected, data.len()),
            ));
        }

        data.sort_by_key(|d| d.index);

        data.into_iter()
            .map(|d| {
                if d.embedding.is_empty() {
                    Err(AppError::malformed(SERVICE, "response is missing an embedding vector"))
                } else if d.embedding.len() != self.dimensions {
                    Err(AppError::malformed(
                        SERVICE,
                        format!(
                            "unexpected embedding dimensions: got {}, expected {}",
                            d.embedding.len(),
                            self.dimensions
                        ),
                    ))
                } else {
                    Ok(d.embedding)
                }
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        SERVICE
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "openai", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);
        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
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
            return Err(AppError::upstream(SERVICE, Some(status.as_u16()), error_text));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::malformed(SERVICE, e.to_string()))?;

        self.check_vectors(texts.len(), body.data)
    }
}
