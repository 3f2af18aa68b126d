//! HTTP client wrapper for the external vector index.

use crate::config::Config;
use crate::index::types::{
    IndexError, PendingRecord, QueryBody, QueryResponse, RetrievalOutcome, UpsertBody,
    UpsertFailure, VectorRecord,
};
use crate::ratelimit::RateLimiter;
use reqwest::{Client, Method};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use time::OffsetDateTime;

/// Lightweight HTTP client for vector index operations.
///
/// Upserts are batched and paced through the injected rate limiter; queries
/// are single bounded calls that degrade to [`RetrievalOutcome::Failed`]
/// instead of propagating errors.
pub struct VectorIndexClient {
    pub(crate) http: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
    pub(crate) batch_size: usize,
    pub(crate) limiter: RateLimiter,
    pub(crate) sequence: AtomicU64,
}

impl VectorIndexClient {
    /// Construct a new client from the pipeline configuration.
    pub fn new(config: &Config) -> Result<Self, IndexError> {
        let http = Client::builder()
            .user_agent("docuchat/0.1")
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let base_url =
            normalize_base_url(&config.vector_index_url).map_err(IndexError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_api_key = config.vector_index_api_key.is_some(),
            batch_size = config.upsert_batch_size,
            "Initialized vector index HTTP client"
        );
        Ok(Self {
            http,
            base_url,
            api_key: config.vector_index_api_key.clone(),
            batch_size: config.upsert_batch_size.max(1),
            limiter: RateLimiter::new(1, Duration::from_millis(config.index_rate_interval_ms)),
            sequence: AtomicU64::new(0),
        })
    }

    /// Upload records to the index in fixed-size batches, assigning ids at
    /// submission time.
    ///
    /// Batches are submitted sequentially; a failing batch aborts the
    /// remaining batches of this call, and the returned [`UpsertFailure`]
    /// carries how many records were already stored.
    pub async fn upsert(&self, pending: Vec<PendingRecord>) -> Result<usize, UpsertFailure> {
        if pending.is_empty() {
            return Ok(0);
        }

        let mut stored = 0usize;
        for (batch_index, batch) in pending.chunks(self.batch_size).enumerate() {
            self.limiter.acquire().await;

            let records: Vec<VectorRecord> = batch
                .iter()
                .enumerate()
                .map(|(position, record)| VectorRecord {
                    id: self.next_record_id(batch_index, position),
                    values: record.values.clone(),
                    metadata: record.metadata.clone(),
                })
                .collect();

            if let Err(error) = self.submit_batch(&records).await {
                tracing::error!(
                    batch_index,
                    batch_len = records.len(),
                    stored,
                    error = %error,
                    "Vector upsert batch failed; aborting remaining batches"
                );
                return Err(UpsertFailure {
                    stored,
                    source: error,
                });
            }

            stored += records.len();
            tracing::debug!(batch_index, batch_len = records.len(), "Upsert batch stored");
        }

        Ok(stored)
    }

    /// Find the `top_k` nearest chunk texts for a query vector.
    ///
    /// Never returns an error: any failure is logged and collapsed to
    /// [`RetrievalOutcome::Failed`] so retrieval degrades to "no context".
    pub async fn query(&self, vector: Vec<f32>, top_k: usize) -> RetrievalOutcome {
        let body = QueryBody {
            vector,
            top_k,
            include_metadata: true,
        };

        let response = match self.request(Method::POST, "query").json(&body).send().await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(error = %error, "Vector index query failed");
                return RetrievalOutcome::Failed;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body, "Vector index query returned an error status");
            return RetrievalOutcome::Failed;
        }

        let payload: QueryResponse = match response.json().await {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(error = %error, "Vector index query response was malformed");
                return RetrievalOutcome::Failed;
            }
        };

        let texts: Vec<String> = payload
            .matches
            .into_iter()
            .take(top_k)
            .filter_map(|hit| hit.metadata.map(|metadata| metadata.text))
            .collect();

        if texts.is_empty() {
            RetrievalOutcome::NoMatches
        } else {
            RetrievalOutcome::Matches(texts)
        }
    }

    async fn submit_batch(&self, records: &[VectorRecord]) -> Result<(), IndexError> {
        let response = self
            .request(Method::POST, "vectors/upsert")
            .json(&UpsertBody { vectors: records })
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(IndexError::UnexpectedStatus { status, body })
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let mut req = self.http.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("Api-Key", api_key);
        }
        req
    }

    /// Ids combine submission timestamp, batch/position counters, and a
    /// per-client sequence, so concurrent upserts in the same millisecond
    /// cannot collide. Never content-derived: duplicate ingestion always
    /// creates new records.
    fn next_record_id(&self, batch_index: usize, position: usize) -> String {
        let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("chunk-{batch_index}-{position}-{millis}-{sequence}")
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::RecordMetadata;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;
    use std::collections::HashSet;

    fn test_client(server: &MockServer) -> VectorIndexClient {
        VectorIndexClient {
            http: Client::builder()
                .user_agent("docuchat-test")
                .build()
                .expect("client"),
            base_url: server.base_url(),
            api_key: Some("index-key".into()),
            batch_size: 10,
            limiter: RateLimiter::unthrottled(),
            sequence: AtomicU64::new(0),
        }
    }

    fn pending(count: usize) -> Vec<PendingRecord> {
        (0..count)
            .map(|i| PendingRecord {
                values: vec![i as f32, 1.0],
                metadata: RecordMetadata {
                    text: format!("chunk {i}"),
                    source_name: "doc.txt".into(),
                    sequence_index: i,
                    total_chunks: count,
                },
            })
            .collect()
    }

    #[tokio::test]
    async fn upsert_splits_into_bounded_batches() {
        let server = MockServer::start_async().await;
        // 25 records with a batch cap of 10 means exactly three requests,
        // whose first records carry sequence indexes 0, 10, and 20.
        let mut batch_mocks = Vec::new();
        for first_index in [0, 10, 20] {
            let mock = server
                .mock_async(|when, then| {
                    when.method(POST)
                        .path("/vectors/upsert")
                        .header("Api-Key", "index-key")
                        .json_body_partial(
                            json!({
                                "vectors": [ { "metadata": { "sequenceIndex": first_index } } ]
                            })
                            .to_string(),
                        );
                    then.status(200).json_body(json!({ "upsertedCount": 10 }));
                })
                .await;
            batch_mocks.push(mock);
        }

        let stored = test_client(&server).upsert(pending(25)).await.expect("stored");

        assert_eq!(stored, 25);
        for mock in &batch_mocks {
            assert_eq!(mock.hits_async().await, 1);
        }
    }

    #[tokio::test]
    async fn failing_batch_aborts_remaining_batches() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/vectors/upsert");
                then.status(500).body("index unavailable");
            })
            .await;

        let failure = test_client(&server).upsert(pending(25)).await.unwrap_err();

        // First batch fails, nothing stored, batches two and three never sent.
        assert_eq!(failure.stored, 0);
        assert!(matches!(
            failure.source,
            IndexError::UnexpectedStatus { status, .. } if status.as_u16() == 500
        ));
        assert_eq!(mock.hits_async().await, 1);
    }

    #[tokio::test]
    async fn record_ids_are_unique_within_a_call() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/vectors/upsert");
                then.status(200).json_body(json!({}));
            })
            .await;

        let client = test_client(&server);
        let mut ids = HashSet::new();
        for batch_index in 0..3 {
            for position in 0..10 {
                assert!(ids.insert(client.next_record_id(batch_index, position)));
            }
        }
        assert_eq!(ids.len(), 30);
    }

    #[tokio::test]
    async fn empty_upsert_is_a_no_op() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/vectors/upsert");
                then.status(200).json_body(json!({}));
            })
            .await;

        let stored = test_client(&server).upsert(Vec::new()).await.expect("stored");
        assert_eq!(stored, 0);
        assert_eq!(mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn query_emits_expected_request_and_caps_results() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/query")
                    .json_body_partial(json!({ "topK": 2, "includeMetadata": true }).to_string());
                then.status(200).json_body(json!({
                    "matches": [
                        { "metadata": { "text": "first" } },
                        { "metadata": { "text": "second" } },
                        { "metadata": { "text": "third" } }
                    ]
                }));
            })
            .await;

        let outcome = test_client(&server).query(vec![0.1, 0.2], 2).await;

        mock.assert();
        assert_eq!(
            outcome,
            RetrievalOutcome::Matches(vec!["first".into(), "second".into()])
        );
    }

    #[tokio::test]
    async fn query_error_degrades_to_failed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/query");
                then.status(503).body("down");
            })
            .await;

        let outcome = test_client(&server).query(vec![0.1], 5).await;
        assert_eq!(outcome, RetrievalOutcome::Failed);
    }

    #[tokio::test]
    async fn query_with_no_matches_is_distinct_from_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/query");
                then.status(200).json_body(json!({ "matches": [] }));
            })
            .await;

        let outcome = test_client(&server).query(vec![0.1], 5).await;
        assert_eq!(outcome, RetrievalOutcome::NoMatches);
    }
}
