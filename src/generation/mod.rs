//! Grounded answer generation against a completion provider.
//!
//! [`AnswerGenerator`] assembles a two-part prompt (a system instruction
//! constraining the model to the supplied context, and a user turn embedding
//! context and question) and calls the provider with fixed sampling
//! parameters. The component never surfaces an error to its caller: any
//! provider failure collapses to a fixed apology string so the chat surface
//! always receives something displayable.

use crate::config::Config;
use crate::metrics::PipelineMetrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Fixed reply returned when the completion provider fails.
pub const ANSWER_FALLBACK: &str =
    "I'm sorry, I wasn't able to generate an answer right now. Please try again.";

const SYSTEM_PROMPT: &str = "You are an AI assistant answering user questions based only on the \
provided context. If the context is ambiguous, for example when two entries share the same name, \
ask a clarifying question instead of guessing. If the answer isn't in the context, respond with \
'I'm sorry, I don't have information about that.'";

/// Output budget requested from the provider.
const MAX_COMPLETION_TOKENS: u32 = 512;
/// Moderate sampling temperature for conversational answers.
const COMPLETION_TEMPERATURE: f32 = 0.3;

/// Errors raised while generating an answer.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// HTTP layer failed before a response arrived.
    #[error("Completion request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider responded with a non-success status.
    #[error("Completion provider returned {status}: {body}")]
    Provider {
        /// HTTP status returned by the provider.
        status: reqwest::StatusCode,
        /// Response body captured for diagnostics.
        body: String,
    },
    /// Provider response did not contain a message.
    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),
}

/// Interface implemented by completion backends.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Produce a completion for a system instruction plus one user turn.
    async fn complete(&self, system: &str, user: &str) -> Result<String, GenerationError>;
}

/// Completion adapter for OpenAI-compatible chat providers.
pub struct HttpCompletionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpCompletionClient {
    /// Build an adapter from the pipeline configuration. Returns `None` when
    /// no provider credentials are present.
    pub fn new(config: &Config) -> Result<Option<Self>, reqwest::Error> {
        let Some(api_key) = config
            .provider_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
        else {
            return Ok(None);
        };
        let http = reqwest::Client::builder()
            .user_agent("docuchat/0.1")
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Some(Self {
            http,
            base_url: config.provider_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: config.completion_model.clone(),
        }))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ApiMessage {
                    role: "system",
                    content: system,
                },
                ApiMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: MAX_COMPLETION_TOKENS,
            temperature: COMPLETION_TEMPERATURE,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, "Completion provider request failed");
            return Err(GenerationError::Provider { status, body });
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|err| GenerationError::MalformedResponse(err.to_string()))?;
        payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                GenerationError::MalformedResponse("response contained no choices".to_string())
            })
    }
}

/// Builds grounding prompts and produces displayable answers.
pub struct AnswerGenerator {
    client: Box<dyn CompletionClient>,
    metrics: Arc<PipelineMetrics>,
}

impl AnswerGenerator {
    /// Create a generator that reports through the shared metrics registry.
    pub fn new(client: Box<dyn CompletionClient>, metrics: Arc<PipelineMetrics>) -> Self {
        Self { client, metrics }
    }

    /// Generate an answer grounded in the assembled context.
    ///
    /// Always returns a displayable string; provider failures are logged,
    /// counted, and replaced by [`ANSWER_FALLBACK`].
    pub async fn answer(&self, question: &str, context: &str) -> String {
        let user_turn = format!("Context:\n{context}\n\nQuestion: {question}");
        match self.client.complete(SYSTEM_PROMPT, &user_turn).await {
            Ok(answer) => {
                self.metrics.record_answer();
                answer
            }
            Err(error) => {
                tracing::warn!(error = %error, "Answer generation failed; returning fallback");
                self.metrics.record_answer_failure();
                ANSWER_FALLBACK.to_string()
            }
        }
    }
}
