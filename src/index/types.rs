//! Shared types used by the vector index client.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned while interacting with the vector index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid vector index URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Index responded with an unexpected status code.
    #[error("Unexpected vector index response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the index.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// A failed upsert call, carrying how much of it landed before the abort.
///
/// Upsert failure is fatal per batch: the failing batch and everything after
/// it is abandoned, but `stored` records from earlier batches remain in the
/// index.
#[derive(Debug, Error)]
#[error("Upsert aborted after storing {stored} records: {source}")]
pub struct UpsertFailure {
    /// Records confirmed stored before the failing batch.
    pub stored: usize,
    /// The error that aborted the call.
    #[source]
    pub source: IndexError,
}

/// Metadata persisted alongside each vector record.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    /// Chunk text content.
    pub text: String,
    /// Original name of the source document.
    pub source_name: String,
    /// Position of the chunk within its document.
    pub sequence_index: usize,
    /// Total chunks produced for the document.
    pub total_chunks: usize,
}

/// An embedded chunk awaiting an id, handed to the gateway for upsert.
#[derive(Debug, Clone)]
pub struct PendingRecord {
    /// Embedding vector produced for the chunk.
    pub values: Vec<f32>,
    /// Metadata stored with the vector.
    pub metadata: RecordMetadata,
}

/// A fully identified record as submitted to the index.
///
/// Ids are assigned by the gateway at submission time from a timestamp plus
/// batch/position/sequence counters; they are unique within a process
/// lifetime but deliberately not content-addressed, so re-ingesting the same
/// document creates new records rather than updating old ones.
#[derive(Debug, Clone, Serialize)]
pub struct VectorRecord {
    /// Unique record identifier.
    pub id: String,
    /// Embedding vector values.
    pub values: Vec<f32>,
    /// Metadata stored with the vector.
    pub metadata: RecordMetadata,
}

/// Result of a retrieval query, keeping "no matches" distinct from "the call
/// failed" so observability does not lose the difference even though both
/// degrade to an empty context for the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalOutcome {
    /// Ranked chunk texts, best first, at most `top_k` of them.
    Matches(Vec<String>),
    /// The index answered with zero matches.
    NoMatches,
    /// The query failed; retrieval degrades to an empty context.
    Failed,
}

#[derive(Serialize)]
pub(crate) struct UpsertBody<'a> {
    pub(crate) vectors: &'a [VectorRecord],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryBody {
    pub(crate) vector: Vec<f32>,
    pub(crate) top_k: usize,
    pub(crate) include_metadata: bool,
}

#[derive(Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub(crate) matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
pub(crate) struct QueryMatch {
    #[serde(default)]
    pub(crate) metadata: Option<MatchMetadata>,
}

#[derive(Deserialize)]
pub(crate) struct MatchMetadata {
    pub(crate) text: String,
}
