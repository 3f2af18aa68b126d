//! Pipeline facade.
//!
//! [`PipelineService`] owns the extractor limits, the chunker parameters, the
//! embedding and completion clients, and the vector index gateway, and
//! exposes the two operations callers care about: `ingest` a document and
//! `answer_question` against what has been ingested. The query path never
//! returns an error; it degrades through fixed context placeholder strings so
//! a chat surface always has something to show.

use crate::config::Config;
use crate::embedding::{EmbeddingClient, HttpEmbeddingClient};
use crate::extract::{self, DocumentKind, ExtractLimits};
use crate::generation::{AnswerGenerator, CompletionClient, HttpCompletionClient};
use crate::index::{PendingRecord, RecordMetadata, RetrievalOutcome, VectorIndexClient};
use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::pipeline::chunking::chunk_text;
use crate::pipeline::types::{Chunk, IngestError, IngestOutcome, IngestStatus, PipelineInitError};
use crate::ratelimit::RateLimiter;
use std::sync::Arc;
use std::time::Duration;

/// Context placeholder returned when no provider credentials are configured.
pub const UNAVAILABLE_MESSAGE: &str = "Document processing is currently unavailable.";
/// Context placeholder returned when the retrieval path fails.
pub const RETRIEVAL_ERROR_MESSAGE: &str = "Error retrieving context. Please try again later.";
/// Context placeholder returned when the index holds nothing relevant.
pub const NO_CONTEXT_MESSAGE: &str = "No relevant context was found for this question.";

/// Orchestrates document ingestion and grounded question answering.
pub struct PipelineService {
    pub(crate) embedding: Box<dyn EmbeddingClient>,
    pub(crate) index: VectorIndexClient,
    pub(crate) generator: Option<AnswerGenerator>,
    pub(crate) embed_limiter: RateLimiter,
    pub(crate) metrics: Arc<PipelineMetrics>,
    pub(crate) chunk_size: usize,
    pub(crate) chunk_overlap: usize,
    pub(crate) max_chunks: usize,
    pub(crate) extract_limits: ExtractLimits,
    pub(crate) max_file_bytes: usize,
    pub(crate) embed_batch_size: usize,
    pub(crate) top_k: usize,
    pub(crate) provider_configured: bool,
}

impl PipelineService {
    /// Wire up the pipeline from its configuration.
    pub fn new(config: &Config) -> Result<Self, PipelineInitError> {
        let metrics = Arc::new(PipelineMetrics::new());
        let embedding = HttpEmbeddingClient::new(config)?;
        let index = VectorIndexClient::new(config)?;
        let generator = HttpCompletionClient::new(config)?.map(|client| {
            AnswerGenerator::new(
                Box::new(client) as Box<dyn CompletionClient>,
                Arc::clone(&metrics),
            )
        });
        if generator.is_none() {
            tracing::warn!(
                "No completion provider credentials; questions will receive a fixed notice"
            );
        }
        Ok(Self {
            embedding: Box::new(embedding),
            index,
            generator,
            embed_limiter: RateLimiter::new(
                1,
                Duration::from_millis(config.embed_rate_interval_ms),
            ),
            metrics,
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            max_chunks: config.max_chunks_per_document,
            extract_limits: ExtractLimits {
                max_chars: config.max_extracted_chars,
                csv_max_rows: config.csv_max_rows,
            },
            max_file_bytes: config.max_file_bytes,
            embed_batch_size: config.embed_batch_size.max(1),
            top_k: config.retrieval_top_k,
            provider_configured: config.provider_configured(),
        })
    }

    /// Ingest one document: extract, chunk, embed, and store.
    ///
    /// Extraction and chunking-parameter failures are fatal. Everything after
    /// that degrades: chunks whose embedding fails are skipped, and an
    /// aborted upsert keeps whatever already landed. Both paths report
    /// [`IngestStatus::Partial`] rather than an error.
    pub async fn ingest(
        &self,
        bytes: &[u8],
        kind: DocumentKind,
        source_name: &str,
    ) -> Result<IngestOutcome, IngestError> {
        tracing::info!(source = source_name, kind = ?kind, size = bytes.len(), "Ingesting document");

        if bytes.len() > self.max_file_bytes {
            tracing::warn!(
                source = source_name,
                size = bytes.len(),
                limit = self.max_file_bytes,
                "File exceeds the size ceiling; accepted without indexing"
            );
            self.metrics.record_oversized();
            self.metrics.record_document(false);
            return Ok(IngestOutcome {
                status: IngestStatus::Complete,
                oversized: true,
                chunk_count: 0,
                stored_records: 0,
                skipped_chunks: 0,
                truncated_chars: 0,
                csv_rows_dropped: 0,
                chunk_chars_dropped: 0,
            });
        }

        let extracted = extract::extract(bytes, kind, &self.extract_limits)?;
        self.metrics.record_truncation(extracted.truncated_chars as u64);
        self.metrics
            .record_csv_rows_dropped(extracted.csv_rows_dropped as u64);

        let plan = chunk_text(
            &extracted.text,
            self.chunk_size,
            self.chunk_overlap,
            self.max_chunks,
        )?;
        if plan.dropped_chars > 0 {
            tracing::warn!(
                source = source_name,
                dropped_chars = plan.dropped_chars,
                max_chunks = self.max_chunks,
                "Chunk ceiling reached; trailing text was not indexed"
            );
            self.metrics
                .record_chunk_chars_dropped(plan.dropped_chars as u64);
        }

        let chunks: Vec<Chunk> = plan
            .chunks
            .into_iter()
            .enumerate()
            .map(|(sequence_index, text)| Chunk {
                text,
                sequence_index,
            })
            .collect();
        let chunk_count = chunks.len();
        if chunk_count == 0 {
            tracing::info!(source = source_name, "Document contained no indexable text");
            self.metrics.record_document(false);
            return Ok(IngestOutcome {
                status: IngestStatus::Complete,
                oversized: false,
                chunk_count: 0,
                stored_records: 0,
                skipped_chunks: 0,
                truncated_chars: extracted.truncated_chars,
                csv_rows_dropped: extracted.csv_rows_dropped,
                chunk_chars_dropped: plan.dropped_chars,
            });
        }

        let (pending, skipped) = self.embed_chunks(chunks, source_name, chunk_count).await;
        self.metrics
            .record_embeddings((chunk_count - skipped) as u64, skipped as u64);

        let (stored, upsert_aborted) = match self.index.upsert(pending).await {
            Ok(stored) => (stored, false),
            Err(failure) => {
                tracing::error!(
                    source = source_name,
                    stored = failure.stored,
                    error = %failure,
                    "Document stored only partially"
                );
                (failure.stored, true)
            }
        };
        self.metrics.record_stored(stored as u64);

        let partial = skipped > 0 || upsert_aborted;
        self.metrics.record_document(partial);
        tracing::info!(
            source = source_name,
            chunk_count,
            stored,
            skipped,
            partial,
            "Document ingestion finished"
        );

        Ok(IngestOutcome {
            status: if partial {
                IngestStatus::Partial
            } else {
                IngestStatus::Complete
            },
            oversized: false,
            chunk_count,
            stored_records: stored,
            skipped_chunks: skipped,
            truncated_chars: extracted.truncated_chars,
            csv_rows_dropped: extracted.csv_rows_dropped,
            chunk_chars_dropped: plan.dropped_chars,
        })
    }

    /// Embed chunks in fixed-size batches, skipping individual failures.
    /// Every provider call waits on the rate limiter, which paces items
    /// within a batch and across batch boundaries alike. Returns the
    /// embedded records and how many chunks were lost.
    async fn embed_chunks(
        &self,
        chunks: Vec<Chunk>,
        source_name: &str,
        total_chunks: usize,
    ) -> (Vec<PendingRecord>, usize) {
        let mut pending = Vec::with_capacity(chunks.len());
        let mut skipped = 0usize;
        for batch in chunks.chunks(self.embed_batch_size) {
            for chunk in batch {
                self.embed_limiter.acquire().await;
                match self.embedding.embed(&chunk.text).await {
                    Ok(values) => pending.push(PendingRecord {
                        values,
                        metadata: RecordMetadata {
                            text: chunk.text.clone(),
                            source_name: source_name.to_string(),
                            sequence_index: chunk.sequence_index,
                            total_chunks,
                        },
                    }),
                    Err(error) => {
                        tracing::warn!(
                            source = source_name,
                            sequence_index = chunk.sequence_index,
                            error = %error,
                            "Skipping chunk after embedding failure"
                        );
                        skipped += 1;
                    }
                }
            }
        }
        (pending, skipped)
    }

    /// Assemble the context block for a question.
    ///
    /// Never fails: an unconfigured provider, an embedding failure, a query
    /// failure, and an empty index each collapse to a fixed placeholder
    /// string that flows into the prompt in place of real context.
    pub async fn retrieve_context(&self, question: &str) -> String {
        if !self.provider_configured {
            return UNAVAILABLE_MESSAGE.to_string();
        }
        let vector = match self.embedding.embed(question).await {
            Ok(vector) => vector,
            Err(error) => {
                tracing::warn!(error = %error, "Question embedding failed");
                self.metrics.record_retrieval_failure();
                return RETRIEVAL_ERROR_MESSAGE.to_string();
            }
        };
        match self.index.query(vector, self.top_k).await {
            RetrievalOutcome::Matches(texts) => texts.join("\n\n"),
            RetrievalOutcome::NoMatches => {
                self.metrics.record_retrieval_empty();
                NO_CONTEXT_MESSAGE.to_string()
            }
            RetrievalOutcome::Failed => {
                self.metrics.record_retrieval_failure();
                RETRIEVAL_ERROR_MESSAGE.to_string()
            }
        }
    }

    /// Answer a question grounded in previously ingested documents.
    ///
    /// Always returns a displayable string. `conversation_id` is carried for
    /// log correlation only; answers are stateless.
    pub async fn answer_question(&self, question: &str, conversation_id: Option<&str>) -> String {
        let Some(generator) = &self.generator else {
            tracing::warn!("Question received but no completion provider is configured");
            return UNAVAILABLE_MESSAGE.to_string();
        };
        tracing::info!(
            conversation_id = conversation_id.unwrap_or("-"),
            question_chars = question.chars().count(),
            "Answering question"
        );
        let context = self.retrieve_context(question).await;
        generator.answer(question, &context).await
    }

    /// Current counter values for the whole pipeline.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
