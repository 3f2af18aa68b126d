#![deny(missing_docs)]

//! Core library for the docuchat ingestion and retrieval pipeline.
//!
//! The crate turns uploaded documents into searchable vector fragments and
//! answers natural-language questions grounded in them. Routing, auth, and
//! relational persistence live in external collaborators; the two entry
//! points are [`pipeline::PipelineService::ingest`] and
//! [`pipeline::PipelineService::answer_question`].

/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and HTTP adapter.
pub mod embedding;
/// Content extraction for supported document types.
pub mod extract;
/// Answer generation against a completion provider.
pub mod generation;
/// Vector index gateway (batched upserts and similarity queries).
pub mod index;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// Chunking and ingestion/query orchestration.
pub mod pipeline;
/// Token-bucket rate limiting for external calls.
pub mod ratelimit;
