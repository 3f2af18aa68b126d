//! End-to-end pipeline tests against mocked provider and index servers.

use docuchat::config::Config;
use docuchat::extract::DocumentKind;
use docuchat::pipeline::{IngestStatus, PipelineService, UNAVAILABLE_MESSAGE};
use httpmock::{Method::POST, MockServer};
use serde_json::json;

fn test_config(provider: &MockServer, index: &MockServer) -> Config {
    Config {
        provider_url: provider.base_url(),
        provider_api_key: Some("provider-key".into()),
        embedding_model: "text-embedding-ada-002".into(),
        embedding_dimension: Some(3),
        completion_model: "gpt-4".into(),
        vector_index_url: index.base_url(),
        vector_index_api_key: Some("index-key".into()),
        chunk_size: 700,
        chunk_overlap: 100,
        max_chunks_per_document: 100,
        max_extracted_chars: 2_000,
        max_file_bytes: 10 * 1024 * 1024,
        csv_max_rows: 5,
        embed_batch_size: 2,
        upsert_batch_size: 10,
        embed_rate_interval_ms: 0,
        index_rate_interval_ms: 0,
        request_timeout_secs: 5,
        retrieval_top_k: 5,
    }
}

async fn mock_embeddings(provider: &MockServer) -> httpmock::Mock<'_> {
    provider
        .mock_async(|when, then| {
            when.method(POST)
                .path("/embeddings")
                .header("authorization", "Bearer provider-key");
            then.status(200)
                .json_body(json!({ "data": [ { "embedding": [0.1, 0.2, 0.3] } ] }));
        })
        .await
}

#[tokio::test]
async fn ingested_documents_ground_a_generated_answer() {
    let provider = MockServer::start_async().await;
    let index = MockServer::start_async().await;

    let embeddings = mock_embeddings(&provider).await;
    let upsert = index
        .mock_async(|when, then| {
            when.method(POST)
                .path("/vectors/upsert")
                .header("Api-Key", "index-key");
            then.status(200).json_body(json!({ "upsertedCount": 2 }));
        })
        .await;
    let query = index
        .mock_async(|when, then| {
            when.method(POST)
                .path("/query")
                .json_body_partial(json!({ "topK": 5, "includeMetadata": true }).to_string());
            then.status(200).json_body(json!({
                "matches": [
                    { "metadata": { "text": "The warranty lasts two years." } },
                    { "metadata": { "text": "Repairs are free in year one." } }
                ]
            }));
        })
        .await;
    let completion = provider
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .body_contains("The warranty lasts two years.")
                .body_contains("How long is the warranty?");
            then.status(200).json_body(json!({
                "choices": [ { "message": { "content": "Two years." } } ]
            }));
        })
        .await;

    let config = test_config(&provider, &index);
    let service = PipelineService::new(&config).expect("pipeline");

    // 1000 chars with 700-char windows advancing 600 at a time: 2 chunks.
    let text = "warranty terms ".repeat(67);
    let outcome = service
        .ingest(&text.as_bytes()[..1000], DocumentKind::Text, "warranty.txt")
        .await
        .expect("outcome");
    assert_eq!(outcome.status, IngestStatus::Complete);
    assert_eq!(outcome.chunk_count, 2);
    assert_eq!(outcome.stored_records, 2);
    assert_eq!(upsert.hits_async().await, 1);

    let answer = service
        .answer_question("How long is the warranty?", Some("conv-42"))
        .await;
    assert_eq!(answer, "Two years.");
    assert_eq!(query.hits_async().await, 1);
    assert_eq!(completion.hits_async().await, 1);
    // Two ingest-time embeddings plus one for the question.
    assert_eq!(embeddings.hits_async().await, 3);

    let snapshot = service.metrics_snapshot();
    assert_eq!(snapshot.documents_ingested, 1);
    assert_eq!(snapshot.chunks_embedded, 2);
    assert_eq!(snapshot.records_stored, 2);
    assert_eq!(snapshot.answers_generated, 1);
}

#[tokio::test]
async fn missing_provider_credentials_yield_the_fixed_notice() {
    let provider = MockServer::start_async().await;
    let index = MockServer::start_async().await;
    let embeddings = mock_embeddings(&provider).await;

    let mut config = test_config(&provider, &index);
    config.provider_api_key = None;
    let service = PipelineService::new(&config).expect("pipeline");

    let answer = service.answer_question("Anything?", None).await;
    assert_eq!(answer, UNAVAILABLE_MESSAGE);
    assert_eq!(embeddings.hits_async().await, 0);
}

#[tokio::test]
async fn oversized_documents_are_truncated_but_still_ingested() {
    let provider = MockServer::start_async().await;
    let index = MockServer::start_async().await;
    mock_embeddings(&provider).await;
    index
        .mock_async(|when, then| {
            when.method(POST).path("/vectors/upsert");
            then.status(200).json_body(json!({ "upsertedCount": 4 }));
        })
        .await;

    let config = test_config(&provider, &index);
    let service = PipelineService::new(&config).expect("pipeline");

    let text = "x".repeat(5_000);
    let outcome = service
        .ingest(text.as_bytes(), DocumentKind::Text, "big.txt")
        .await
        .expect("outcome");

    // Capped at 2000 chars; 700-char windows advancing 600 give 4 chunks.
    assert_eq!(outcome.truncated_chars, 3_000);
    assert_eq!(outcome.chunk_count, 4);
    assert_eq!(outcome.stored_records, 4);
    assert_eq!(outcome.status, IngestStatus::Complete);
    assert!(outcome.lossy());
    assert_eq!(service.metrics_snapshot().chars_truncated, 3_000);
}

#[tokio::test]
async fn oversized_files_complete_the_upload_contract_with_zero_records() {
    let provider = MockServer::start_async().await;
    let index = MockServer::start_async().await;
    let embeddings = mock_embeddings(&provider).await;
    let upsert = index
        .mock_async(|when, then| {
            when.method(POST).path("/vectors/upsert");
            then.status(200).json_body(json!({}));
        })
        .await;

    let mut config = test_config(&provider, &index);
    config.max_file_bytes = 1_024;
    let service = PipelineService::new(&config).expect("pipeline");

    let text = "y".repeat(2_048);
    let outcome = service
        .ingest(text.as_bytes(), DocumentKind::Text, "huge.txt")
        .await
        .expect("outcome");

    assert!(outcome.oversized);
    assert_eq!(outcome.status, IngestStatus::Complete);
    assert_eq!(outcome.stored_records, 0);
    assert_eq!(embeddings.hits_async().await, 0);
    assert_eq!(upsert.hits_async().await, 0);
    assert_eq!(service.metrics_snapshot().documents_oversized, 1);
}

#[tokio::test]
async fn csv_rows_beyond_the_cap_are_dropped_during_ingestion() {
    let provider = MockServer::start_async().await;
    let index = MockServer::start_async().await;
    mock_embeddings(&provider).await;
    index
        .mock_async(|when, then| {
            when.method(POST).path("/vectors/upsert");
            then.status(200).json_body(json!({ "upsertedCount": 1 }));
        })
        .await;

    let config = test_config(&provider, &index);
    let service = PipelineService::new(&config).expect("pipeline");

    let mut csv = String::from("name,role\n");
    for i in 0..8 {
        csv.push_str(&format!("person-{i},engineer\n"));
    }
    let outcome = service
        .ingest(csv.as_bytes(), DocumentKind::Csv, "team.csv")
        .await
        .expect("outcome");

    assert_eq!(outcome.csv_rows_dropped, 3);
    assert_eq!(outcome.chunk_count, 1);
    assert_eq!(outcome.status, IngestStatus::Complete);
    assert_eq!(service.metrics_snapshot().csv_rows_dropped, 3);
}

#[tokio::test]
async fn index_outage_during_ingest_reports_partial_success() {
    let provider = MockServer::start_async().await;
    let index = MockServer::start_async().await;
    mock_embeddings(&provider).await;
    index
        .mock_async(|when, then| {
            when.method(POST).path("/vectors/upsert");
            then.status(503).body("index unavailable");
        })
        .await;

    let config = test_config(&provider, &index);
    let service = PipelineService::new(&config).expect("pipeline");

    let text = "a".repeat(1_000);
    let outcome = service
        .ingest(text.as_bytes(), DocumentKind::Text, "doc.txt")
        .await
        .expect("outcome");

    assert_eq!(outcome.status, IngestStatus::Partial);
    assert_eq!(outcome.chunk_count, 2);
    assert_eq!(outcome.stored_records, 0);
    let snapshot = service.metrics_snapshot();
    assert_eq!(snapshot.documents_partial, 1);
    assert_eq!(snapshot.records_stored, 0);
}
