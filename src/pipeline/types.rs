//! Types shared across the ingestion and query paths.

use crate::extract::ExtractError;
use crate::index::IndexError;
use crate::pipeline::chunking::ChunkConfigError;
use thiserror::Error;

/// Errors that abort document ingestion.
///
/// Only extraction and chunking-parameter failures are fatal; embedding and
/// storage failures degrade to a partial [`IngestOutcome`] instead.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The document bytes could not be converted to text.
    #[error(transparent)]
    Extraction(#[from] ExtractError),
    /// The configured chunking parameters are unusable.
    #[error(transparent)]
    Chunking(#[from] ChunkConfigError),
}

/// Errors raised while wiring the pipeline together at startup.
#[derive(Debug, Error)]
pub enum PipelineInitError {
    /// An HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
    /// The vector index client rejected its configuration.
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// One window of document text awaiting embedding.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Window text.
    pub text: String,
    /// Position of this window within the document, starting at zero.
    pub sequence_index: usize,
}

/// Whether an ingestion stored everything it chunked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStatus {
    /// Every chunk was embedded and stored.
    Complete,
    /// Some chunks were skipped or an upsert batch aborted; the records that
    /// did land remain in the index.
    Partial,
}

/// Report returned for each ingested document.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Whether ingestion degraded partway.
    pub status: IngestStatus,
    /// The file exceeded the size ceiling and was accepted without indexing.
    pub oversized: bool,
    /// Chunks produced from the extracted text.
    pub chunk_count: usize,
    /// Records confirmed stored by the vector index.
    pub stored_records: usize,
    /// Chunks skipped after an embedding failure.
    pub skipped_chunks: usize,
    /// Characters removed by the extraction length caps.
    pub truncated_chars: usize,
    /// CSV rows dropped beyond the configured row cap.
    pub csv_rows_dropped: usize,
    /// Characters dropped once the chunk ceiling was reached.
    pub chunk_chars_dropped: usize,
}

impl IngestOutcome {
    /// Whether any configured cap removed content from this document.
    pub fn lossy(&self) -> bool {
        self.truncated_chars > 0 || self.csv_rows_dropped > 0 || self.chunk_chars_dropped > 0
    }
}
