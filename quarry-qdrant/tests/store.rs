use quarry_core::{Document, MetadataFilter, StoreError, VectorStore};
use quarry_qdrant::{QdrantStoreError, QdrantVectorStore};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store(server: &MockServer) -> QdrantVectorStore {
    QdrantVectorStore::builder()
        .base_url(server.uri())
        .collection("docs")
        .dimension(2)
        .build()
        .unwrap()
}

fn doc(id: &str, content: &str, category: &str) -> Document {
    Document {
        id: id.to_string(),
        content: content.to_string(),
        metadata: [("category".to_string(), category.to_string())]
            .into_iter()
            .collect(),
        embedding: vec![1.0, 0.0],
        sequence: 0,
    }
}

fn ok(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"result": result, "status": "ok", "time": 0.001}))
}

#[tokio::test]
async fn upsert_puts_points_and_waits() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/collections/docs/points"))
        .and(query_param("wait", "true"))
        .and(header("api-key", "secret"))
        .and(body_partial_json(json!({
            "points": [{
                "id": "a",
                "payload": {"content": "alpha", "metadata": {"category": "x"}, "sequence": 0}
            }]
        })))
        .respond_with(ok(json!({"operation_id": 1, "status": "completed"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = QdrantVectorStore::builder()
        .base_url(server.uri())
        .collection("docs")
        .api_key("secret")
        .build()
        .unwrap();
    store.upsert(vec![doc("a", "alpha", "x")]).await.unwrap();
}

#[tokio::test]
async fn upsert_rejects_wrong_dimension_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ok(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let mut bad = doc("b", "beta", "x");
    bad.embedding = vec![1.0, 0.0, 0.0];
    let err = store(&server)
        .upsert(vec![doc("a", "alpha", "x"), bad])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DimensionMismatch { expected: 2, got: 3 }));
}

#[tokio::test]
async fn failed_later_chunk_reports_committed_ids() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/collections/docs/points"))
        .and(body_partial_json(json!({"points": [{"id": "a"}]})))
        .respond_with(ok(json!({"status": "completed"})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/collections/docs/points"))
        .and(body_partial_json(json!({"points": [{"id": "b"}]})))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"status": {"error": "disk full"}})),
        )
        .mount(&server)
        .await;

    let store = QdrantVectorStore::builder()
        .base_url(server.uri())
        .collection("docs")
        .upsert_batch_size(1)
        .build()
        .unwrap();
    let err = store
        .upsert(vec![doc("a", "alpha", "x"), doc("b", "beta", "x")])
        .await
        .unwrap_err();

    assert_eq!(err.committed_ids(), ["a".to_string()]);
    assert!(err.to_string().contains("disk full"));
}

#[tokio::test]
async fn first_chunk_failure_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = store(&server)
        .upsert(vec![doc("a", "alpha", "x")])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(message) if message.contains("overloaded")));
}

#[tokio::test]
async fn query_sends_filter_and_sorts_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections/docs/points/search"))
        .and(body_partial_json(json!({
            "limit": 3,
            "with_payload": true,
            "filter": {"must": [{"key": "metadata.category", "match": {"value": "biology"}}]}
        })))
        .respond_with(ok(json!([
            {"id": "doc-1", "score": 0.1, "payload": {"content": "first", "metadata": {"category": "biology"}}},
            {"id": "doc-2", "score": 0.9, "payload": {"content": "second", "metadata": {"category": "biology"}}},
            {"id": "doc-3", "score": 0.4, "payload": {"content": "third", "metadata": {"category": "biology"}}}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let filter = MetadataFilter::eq("category", "biology");
    let results = store(&server)
        .query(&[1.0, 0.0], 3, Some(&filter))
        .await
        .unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.document.id.as_str()).collect();
    assert_eq!(ids, vec!["doc-2", "doc-3", "doc-1"]);
    assert_eq!(results[0].document.content, "second");
}

#[tokio::test]
async fn equal_scores_follow_insertion_sequence() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections/docs/points/search"))
        .respond_with(ok(json!([
            {"id": "late", "score": 0.5, "payload": {"content": "late", "sequence": 30}},
            {"id": "top", "score": 0.8, "payload": {"content": "top", "sequence": 40}},
            {"id": "early", "score": 0.5, "payload": {"content": "early", "sequence": 10}},
            {"id": "middle", "score": 0.5, "payload": {"content": "middle", "sequence": 20}}
        ])))
        .mount(&server)
        .await;

    let results = store(&server).query(&[1.0, 0.0], 3, None).await.unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.document.id.as_str()).collect();
    assert_eq!(ids, vec!["top", "early", "middle"]);
}

#[tokio::test]
async fn query_rejects_wrong_dimension() {
    let server = MockServer::start().await;
    let err = store(&server).query(&[1.0], 3, None).await.unwrap_err();
    assert!(matches!(err, StoreError::DimensionMismatch { expected: 2, got: 1 }));
}

#[tokio::test]
async fn query_surfaces_invalid_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections/docs/points/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not-json"))
        .mount(&server)
        .await;

    let err = store(&server).query(&[1.0, 0.0], 1, None).await.unwrap_err();
    let source = match err {
        StoreError::Internal(source) => source,
        other => panic!("expected internal error, got {other:?}"),
    };
    let source = source.downcast_ref::<QdrantStoreError>().unwrap();
    assert!(matches!(source, QdrantStoreError::InvalidResponse { .. }));
}

#[tokio::test]
async fn missing_collection_is_reported_by_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections/docs/points/search"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "status": {"error": "Not found: Collection `docs` doesn't exist!"}
        })))
        .mount(&server)
        .await;

    let err = store(&server).query(&[1.0, 0.0], 1, None).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Store error: collection 'docs' not found: Not found: Collection `docs` doesn't exist!"
    );
}

#[tokio::test]
async fn count_is_exact() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections/docs/points/count"))
        .and(body_partial_json(json!({"exact": true})))
        .respond_with(ok(json!({"count": 4})))
        .mount(&server)
        .await;

    assert_eq!(store(&server).count().await.unwrap(), Some(4));
}

#[tokio::test]
async fn ensure_collection_creates_missing_collection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/docs"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "status": {"error": "Not found: Collection `docs` doesn't exist!"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/collections/docs"))
        .and(body_partial_json(json!({"vectors": {"size": 2, "distance": "Cosine"}})))
        .respond_with(ok(json!(true)))
        .expect(1)
        .mount(&server)
        .await;

    store(&server).ensure_collection(2).await.unwrap();
}

#[tokio::test]
async fn ensure_collection_rejects_size_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/docs"))
        .respond_with(ok(json!({
            "status": "green",
            "config": {"params": {"vectors": {"size": 768, "distance": "Cosine"}}}
        })))
        .mount(&server)
        .await;

    let err = store(&server).ensure_collection(2).await.unwrap_err();
    assert!(matches!(
        err,
        QdrantStoreError::CollectionDimensionMismatch { expected: 2, actual: 768, .. }
    ));
}
