use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion and query activity.
///
/// Every silent policy in the pipeline (truncation caps, dropped CSV rows,
/// skipped chunks, aborted upsert batches) increments a counter here so the
/// cost of degradation stays observable even though callers never see an
/// error.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_ingested: AtomicU64,
    documents_partial: AtomicU64,
    documents_oversized: AtomicU64,
    chunks_embedded: AtomicU64,
    chunks_skipped: AtomicU64,
    records_stored: AtomicU64,
    chars_truncated: AtomicU64,
    csv_rows_dropped: AtomicU64,
    chunk_chars_dropped: AtomicU64,
    retrieval_no_matches: AtomicU64,
    retrieval_failures: AtomicU64,
    answers_generated: AtomicU64,
    answer_failures: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed ingestion and whether it degraded partway.
    pub fn record_document(&self, partial: bool) {
        self.documents_ingested.fetch_add(1, Ordering::Relaxed);
        if partial {
            self.documents_partial.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a document accepted but never indexed because it exceeded the
    /// file size ceiling.
    pub fn record_oversized(&self) {
        self.documents_oversized.fetch_add(1, Ordering::Relaxed);
    }

    /// Record embedding results for one document.
    pub fn record_embeddings(&self, embedded: u64, skipped: u64) {
        self.chunks_embedded.fetch_add(embedded, Ordering::Relaxed);
        self.chunks_skipped.fetch_add(skipped, Ordering::Relaxed);
    }

    /// Record vectors durably stored in the external index.
    pub fn record_stored(&self, count: u64) {
        self.records_stored.fetch_add(count, Ordering::Relaxed);
    }

    /// Record characters cut by the extraction length cap.
    pub fn record_truncation(&self, chars: u64) {
        self.chars_truncated.fetch_add(chars, Ordering::Relaxed);
    }

    /// Record CSV rows dropped beyond the row cap.
    pub fn record_csv_rows_dropped(&self, rows: u64) {
        self.csv_rows_dropped.fetch_add(rows, Ordering::Relaxed);
    }

    /// Record characters dropped once the chunk ceiling was reached.
    pub fn record_chunk_chars_dropped(&self, chars: u64) {
        self.chunk_chars_dropped.fetch_add(chars, Ordering::Relaxed);
    }

    /// Record a retrieval that returned no matches.
    pub fn record_retrieval_empty(&self) {
        self.retrieval_no_matches.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a retrieval that failed and degraded to a fallback string.
    pub fn record_retrieval_failure(&self) {
        self.retrieval_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an answer produced by the completion provider.
    pub fn record_answer(&self) {
        self.answers_generated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an answer that fell back to the apology string.
    pub fn record_answer_failure(&self) {
        self.answer_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_ingested: self.documents_ingested.load(Ordering::Relaxed),
            documents_partial: self.documents_partial.load(Ordering::Relaxed),
            documents_oversized: self.documents_oversized.load(Ordering::Relaxed),
            chunks_embedded: self.chunks_embedded.load(Ordering::Relaxed),
            chunks_skipped: self.chunks_skipped.load(Ordering::Relaxed),
            records_stored: self.records_stored.load(Ordering::Relaxed),
            chars_truncated: self.chars_truncated.load(Ordering::Relaxed),
            csv_rows_dropped: self.csv_rows_dropped.load(Ordering::Relaxed),
            chunk_chars_dropped: self.chunk_chars_dropped.load(Ordering::Relaxed),
            retrieval_no_matches: self.retrieval_no_matches.load(Ordering::Relaxed),
            retrieval_failures: self.retrieval_failures.load(Ordering::Relaxed),
            answers_generated: self.answers_generated.load(Ordering::Relaxed),
            answer_failures: self.answer_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents accepted by `ingest` since startup.
    pub documents_ingested: u64,
    /// Documents whose ingestion degraded to partial success.
    pub documents_partial: u64,
    /// Documents accepted but skipped for exceeding the file size ceiling.
    pub documents_oversized: u64,
    /// Chunks successfully embedded.
    pub chunks_embedded: u64,
    /// Chunks skipped after an embedding failure.
    pub chunks_skipped: u64,
    /// Vector records confirmed stored by the index.
    pub records_stored: u64,
    /// Characters removed by the extraction length cap.
    pub chars_truncated: u64,
    /// CSV rows dropped beyond the configured row cap.
    pub csv_rows_dropped: u64,
    /// Characters dropped after the chunk-count ceiling.
    pub chunk_chars_dropped: u64,
    /// Queries that found no relevant context.
    pub retrieval_no_matches: u64,
    /// Queries whose retrieval path failed outright.
    pub retrieval_failures: u64,
    /// Answers generated by the completion provider.
    pub answers_generated: u64,
    /// Answers replaced by the fixed apology string.
    pub answer_failures: u64,
}
