mod common;

use common::mocks::HashEmbedder;
use common::{index_spec, TEST_INDEX};
use medrag::db::{PineconeConfig, PineconeStore, VectorStore};
use medrag::rag::chunker::TextChunker;
use medrag::rag::Ingestor;
use medrag::types::{AppError, ChunkMetadata, IndexRecord};
use medrag::utils::retry::RetryPolicy;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "pc-test-key";

fn store(server: &MockServer) -> PineconeStore {
    store_with_ready_timeout(server, 2)
}

fn store_with_ready_timeout(server: &MockServer, ready_timeout_secs: u64) -> PineconeStore {
    let config = PineconeConfig {
        control_plane_url: server.uri(),
        ready_timeout_secs,
        ..PineconeConfig::default()
    };
    PineconeStore::new(API_KEY.to_string(), &config)
        .unwrap()
        .with_ready_poll_interval(Duration::from_millis(10))
}

fn describe_body(server: &MockServer, ready: bool) -> serde_json::Value {
    json!({
        "name": TEST_INDEX,
        "dimension": 3,
        "metric": "cosine",
        "host": server.uri(),
        "spec": { "serverless": { "cloud": "aws", "region": "us-east-1" } },
        "status": { "ready": ready, "state": if ready { "Ready" } else { "Initializing" } }
    })
}

async fn mount_existing_index(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/indexes/{}", TEST_INDEX)))
        .respond_with(ResponseTemplate::new(200).set_body_json(describe_body(server, true)))
        .mount(server)
        .await;
}

fn record(id: &str, embedding: Vec<f32>) -> IndexRecord {
    IndexRecord {
        id: id.to_string(),
        content: "Aspirin reduces fever and inflammation.".to_string(),
        metadata: ChunkMetadata {
            source: "data/Medical_book.pdf".to_string(),
            page: Some(41),
            chunk_index: 2,
        },
        embedding,
    }
}

#[tokio::test]
async fn test_ensure_index_creates_missing_index() {
    let server = MockServer::start().await;

    // Absent on the first describe
    Mock::given(method("GET"))
        .and(path(format!("/indexes/{}", TEST_INDEX)))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    // Then initializing once, then ready
    Mock::given(method("GET"))
        .and(path(format!("/indexes/{}", TEST_INDEX)))
        .respond_with(ResponseTemplate::new(200).set_body_json(describe_body(&server, false)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_existing_index(&server).await;

    Mock::given(method("POST"))
        .and(path("/indexes"))
        .and(header("api-key", API_KEY))
        .and(header("x-pinecone-api-version", "2024-07"))
        .and(body_partial_json(json!({
            "name": TEST_INDEX,
            "dimension": 3,
            "metric": "cosine",
            "spec": { "serverless": { "cloud": "aws", "region": "us-east-1" } }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(describe_body(&server, false)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/describe_index_stats"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "dimension": 3, "totalVectorCount": 0 })),
        )
        .mount(&server)
        .await;

    let stats = store(&server).ensure_index(&index_spec(3)).await.unwrap();

    assert_eq!(stats.name, TEST_INDEX);
    assert_eq!(stats.dimension, 3);
    assert_eq!(stats.record_count, 0);
}

#[tokio::test]
async fn test_ensure_index_waits_for_initializing_index() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/indexes/{}", TEST_INDEX)))
        .respond_with(ResponseTemplate::new(200).set_body_json(describe_body(&server, false)))
        .up_to_n_times(3)
        .mount(&server)
        .await;
    mount_existing_index(&server).await;

    Mock::given(method("POST"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/describe_index_stats"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "dimension": 3, "totalVectorCount": 0 })),
        )
        .mount(&server)
        .await;

    store(&server).ensure_index(&index_spec(3)).await.unwrap();

    let describes = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "GET")
        .count();
    assert!(describes >= 4, "expected polling until ready, saw {} describes", describes);
}

#[tokio::test]
async fn test_ingest_never_upserts_into_unready_index() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/indexes/{}", TEST_INDEX)))
        .respond_with(ResponseTemplate::new(200).set_body_json(describe_body(&server, false)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "upsertedCount": 1 })))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("aspirin.txt"),
        "Aspirin reduces fever and inflammation.",
    )
    .unwrap();

    // Attempt deadline far shorter than the readiness timeout
    let retry = RetryPolicy::new(
        2,
        Duration::from_millis(1),
        Duration::from_millis(1),
        Duration::from_millis(200),
    );
    let ingestor = Ingestor::new(
        Arc::new(HashEmbedder::with_dimensions(3)),
        Arc::new(store_with_ready_timeout(&server, 1)),
        TextChunker::new(500, 20).unwrap(),
        index_spec(3),
    )
    .with_retry(retry);

    let result = ingestor.run(dir.path()).await;

    assert!(matches!(result, Err(AppError::Unavailable(_))), "{:?}", result);
}

#[tokio::test]
async fn test_ensure_index_rejects_dimension_mismatch() {
    let server = MockServer::start().await;
    mount_existing_index(&server).await;

    Mock::given(method("POST"))
        .and(path("/describe_index_stats"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "dimension": 3, "totalVectorCount": 7 })),
        )
        .mount(&server)
        .await;

    let result = store(&server).ensure_index(&index_spec(384)).await;

    assert!(matches!(result, Err(AppError::Configuration(_))));
}

#[tokio::test]
async fn test_create_existing_index_conflicts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(409).set_body_string("ALREADY_EXISTS"))
        .mount(&server)
        .await;

    let result = store(&server).create_index(&index_spec(3)).await;

    assert!(matches!(result, Err(AppError::InvalidInput(_))));
}

#[tokio::test]
async fn test_upsert_sends_records_with_metadata() {
    let server = MockServer::start().await;
    mount_existing_index(&server).await;

    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .and(header("api-key", API_KEY))
        .and(body_partial_json(json!({
            "namespace": "",
            "vectors": [{
                "id": "rec-1",
                "values": [1.0, 0.0, 0.0],
                "metadata": {
                    "text": "Aspirin reduces fever and inflammation.",
                    "source": "data/Medical_book.pdf",
                    "page": 41,
                    "chunk_index": 2
                }
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "upsertedCount": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let written = store(&server)
        .upsert(TEST_INDEX, &[record("rec-1", vec![1.0, 0.0, 0.0])])
        .await
        .unwrap();

    assert_eq!(written, 1);
}

#[tokio::test]
async fn test_upsert_rejects_wrong_dimension_before_sending() {
    let server = MockServer::start().await;
    mount_existing_index(&server).await;

    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "upsertedCount": 1 })))
        .expect(0)
        .mount(&server)
        .await;

    let result = store(&server)
        .upsert(TEST_INDEX, &[record("rec-1", vec![1.0, 0.0])])
        .await;

    assert!(matches!(result, Err(AppError::Configuration(_))));
}

#[tokio::test]
async fn test_query_parses_matches() {
    let server = MockServer::start().await;
    mount_existing_index(&server).await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({ "topK": 2, "includeMetadata": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [
                {
                    "id": "rec-1",
                    "score": 0.92,
                    "metadata": {
                        "text": "Aspirin reduces fever and inflammation.",
                        "source": "data/Medical_book.pdf",
                        "page": 41.0,
                        "chunk_index": 2.0
                    }
                },
                {
                    "id": "rec-2",
                    "score": 0.40,
                    "metadata": { "text": "Insulin regulates blood glucose.", "source": "data/Medical_book.pdf" }
                }
            ],
            "namespace": ""
        })))
        .mount(&server)
        .await;

    let results = store(&server)
        .query(TEST_INDEX, &[1.0, 0.0, 0.0], 2)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "rec-1");
    assert!(results[0].content.contains("Aspirin"));
    assert_eq!(results[0].metadata.page, Some(41));
    assert_eq!(results[0].metadata.chunk_index, 2);
    assert_eq!(results[1].metadata.page, None);
    assert!(results[0].score > results[1].score);
}

#[tokio::test]
async fn test_query_missing_index_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/indexes/{}", TEST_INDEX)))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;

    let pinecone = store(&server);

    assert!(!pinecone.index_exists(TEST_INDEX).await.unwrap());
    assert!(matches!(
        pinecone.query(TEST_INDEX, &[1.0, 0.0, 0.0], 3).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_query_wrong_dimension_is_configuration_error() {
    let server = MockServer::start().await;
    mount_existing_index(&server).await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "matches": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let result = store(&server).query(TEST_INDEX, &[1.0; 384], 3).await;

    assert!(matches!(result, Err(AppError::Configuration(_))));
}

#[tokio::test]
async fn test_error_status_mapping() {
    let server = MockServer::start().await;
    mount_existing_index(&server).await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API Key"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Bad Request"))
        .mount(&server)
        .await;

    let pinecone = store(&server);
    let vector = [1.0, 0.0, 0.0];

    let rate_limited = pinecone.query(TEST_INDEX, &vector, 3).await.unwrap_err();
    assert!(matches!(rate_limited, AppError::Unavailable(_)));
    assert!(rate_limited.is_transient());

    let server_error = pinecone.query(TEST_INDEX, &vector, 3).await.unwrap_err();
    assert!(matches!(server_error, AppError::Unavailable(_)));

    let unauthorized = pinecone.query(TEST_INDEX, &vector, 3).await.unwrap_err();
    assert!(matches!(unauthorized, AppError::Configuration(_)));

    let bad_request = pinecone.query(TEST_INDEX, &vector, 3).await.unwrap_err();
    assert!(matches!(bad_request, AppError::VectorStore(_)));
    assert!(!bad_request.is_transient());
}
