//! Document ingestion and question answering.
//!
//! The pipeline turns uploaded document bytes into overlapping text chunks,
//! embeds them, and stores the vectors in the external index; at query time
//! it embeds the question, retrieves the nearest chunks, and grounds a
//! completion on them. [`PipelineService`] is the facade callers use for
//! both halves.

/// Sliding-window chunker.
pub mod chunking;
/// Pipeline facade.
pub mod service;
/// Shared pipeline types.
pub mod types;

pub use chunking::{ChunkConfigError, ChunkPlan, chunk_text};
pub use service::{
    NO_CONTEXT_MESSAGE, PipelineService, RETRIEVAL_ERROR_MESSAGE, UNAVAILABLE_MESSAGE,
};
pub use types::{Chunk, IngestError, IngestOutcome, IngestStatus, PipelineInitError};
