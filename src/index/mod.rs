//! Vector index gateway.
//!
//! Batched upserts and nearest-neighbor queries against the external vector
//! store, speaking JSON over HTTPS with an API-key header. The store itself
//! is treated as an opaque nearest-neighbor oracle.

/// HTTP client for the vector index.
pub mod client;
/// Wire and error types shared by the gateway.
pub mod types;

pub use client::VectorIndexClient;
pub use types::{
    IndexError, PendingRecord, RecordMetadata, RetrievalOutcome, UpsertFailure, VectorRecord,
};
