use serde::Deserialize;
use std::env;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the docuchat pipeline.
///
/// Constructed once near process start and passed to each component by
/// reference; the crate keeps no ambient configuration state.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the embedding/completion provider API.
    pub provider_url: String,
    /// API key for the embedding/completion provider. When absent the query
    /// path degrades to an explicit "unavailable" sentinel.
    pub provider_api_key: Option<String>,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Optional expected dimensionality of the produced vectors.
    pub embedding_dimension: Option<usize>,
    /// Completion model used for answer generation.
    pub completion_model: String,
    /// Base URL of the external vector index.
    pub vector_index_url: String,
    /// Optional API key sent to the vector index.
    pub vector_index_api_key: Option<String>,
    /// Sliding-window size in characters for chunking.
    pub chunk_size: usize,
    /// Overlap in characters between adjacent chunks.
    pub chunk_overlap: usize,
    /// Hard ceiling on chunks produced per document.
    pub max_chunks_per_document: usize,
    /// Hard ceiling on extracted text length in characters.
    pub max_extracted_chars: usize,
    /// Files larger than this many bytes are accepted but never indexed.
    pub max_file_bytes: usize,
    /// Maximum CSV rows converted during extraction.
    pub csv_max_rows: usize,
    /// Number of chunks embedded per batch during ingestion.
    pub embed_batch_size: usize,
    /// Maximum records submitted per vector index upsert request.
    pub upsert_batch_size: usize,
    /// Refill interval in milliseconds for the embedding rate limiter.
    pub embed_rate_interval_ms: u64,
    /// Refill interval in milliseconds for the vector index rate limiter.
    pub index_rate_interval_ms: u64,
    /// Uniform per-request deadline for all external HTTP calls, in seconds.
    pub request_timeout_secs: u64,
    /// Number of nearest neighbors fetched per retrieval query.
    pub retrieval_top_k: usize,
}

impl Config {
    /// Load configuration from environment variables, performing validation
    /// along the way. `.env` files are honored via `dotenvy`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config = Self {
            provider_url: load_env_optional("PROVIDER_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            provider_api_key: load_env_optional("PROVIDER_API_KEY"),
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| "text-embedding-ada-002".to_string()),
            embedding_dimension: load_env_parsed("EMBEDDING_DIMENSION")?,
            completion_model: load_env_optional("COMPLETION_MODEL")
                .unwrap_or_else(|| "gpt-4".to_string()),
            vector_index_url: load_env("VECTOR_INDEX_URL")?,
            vector_index_api_key: load_env_optional("VECTOR_INDEX_API_KEY"),
            chunk_size: load_env_parsed("CHUNK_SIZE")?.unwrap_or(700),
            chunk_overlap: load_env_parsed("CHUNK_OVERLAP")?.unwrap_or(100),
            max_chunks_per_document: load_env_parsed("MAX_CHUNKS_PER_DOCUMENT")?.unwrap_or(100),
            max_extracted_chars: load_env_parsed("MAX_EXTRACTED_CHARS")?.unwrap_or(50_000),
            max_file_bytes: load_env_parsed("MAX_FILE_BYTES")?.unwrap_or(10 * 1024 * 1024),
            csv_max_rows: load_env_parsed("CSV_MAX_ROWS")?.unwrap_or(100),
            embed_batch_size: load_env_parsed("EMBED_BATCH_SIZE")?.unwrap_or(2),
            upsert_batch_size: load_env_parsed("UPSERT_BATCH_SIZE")?.unwrap_or(10),
            embed_rate_interval_ms: load_env_parsed("EMBED_RATE_INTERVAL_MS")?.unwrap_or(200),
            index_rate_interval_ms: load_env_parsed("INDEX_RATE_INTERVAL_MS")?.unwrap_or(500),
            request_timeout_secs: load_env_parsed("REQUEST_TIMEOUT_SECS")?.unwrap_or(30),
            retrieval_top_k: load_env_parsed("RETRIEVAL_TOP_K")?.unwrap_or(5),
        };
        tracing::debug!(
            provider_url = %config.provider_url,
            vector_index_url = %config.vector_index_url,
            embedding_model = %config.embedding_model,
            completion_model = %config.completion_model,
            chunk_size = config.chunk_size,
            chunk_overlap = config.chunk_overlap,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Whether embedding/completion credentials are present.
    pub fn provider_configured(&self) -> bool {
        self.provider_api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false)
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}
