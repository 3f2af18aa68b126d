//! Embedding client abstraction and HTTP adapter.
//!
//! The ingestion loop and the query path both embed text through the
//! [`EmbeddingClient`] seam. The bundled adapter speaks the common
//! `POST {base}/embeddings` provider contract and reads the vector out of
//! `data[0].embedding`; everything else about the provider is treated as an
//! opaque oracle.

use crate::config::Config;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// No provider credentials are configured.
    #[error("Embedding provider is not configured")]
    Unconfigured,
    /// HTTP layer failed before a response arrived.
    #[error("Embedding request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider responded with a non-success status.
    #[error("Embedding provider returned {status}: {body}")]
    Provider {
        /// HTTP status returned by the provider.
        status: reqwest::StatusCode,
        /// Response body captured for diagnostics.
        body: String,
    },
    /// Provider response did not contain a vector.
    #[error("Malformed embedding response: {0}")]
    MalformedResponse(String),
    /// Returned vector length does not match the configured dimension.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension configured for the pipeline.
        expected: usize,
        /// Dimension actually produced by the provider.
        actual: usize,
    },
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce one embedding vector for the supplied text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Embedding adapter for OpenAI-compatible providers.
pub struct HttpEmbeddingClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    expected_dimension: Option<usize>,
}

impl HttpEmbeddingClient {
    /// Build an adapter from the pipeline configuration.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent("docuchat/0.1")
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.provider_url.trim_end_matches('/').to_string(),
            api_key: config.provider_api_key.clone(),
            model: config.embedding_model.clone(),
            expected_dimension: config.embedding_dimension,
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = match self.api_key.as_deref().filter(|key| !key.trim().is_empty()) {
            Some(key) => key,
            None => return Err(EmbeddingError::Unconfigured),
        };

        let body = EmbeddingRequest {
            model: &self.model,
            input: text,
        };
        let response = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, "Embedding provider request failed");
            return Err(EmbeddingError::Provider { status, body });
        }

        let payload: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| EmbeddingError::MalformedResponse(err.to_string()))?;
        let vector = payload
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| {
                EmbeddingError::MalformedResponse("response contained no embeddings".to_string())
            })?;

        if let Some(expected) = self.expected_dimension
            && vector.len() != expected
        {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        Ok(vector)
    }
}
