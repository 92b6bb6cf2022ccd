#![cfg(feature = "openai")]

use async_openai::config::OpenAIConfig;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use quarry_core::{Embedding, EmbeddingError};
use quarry_embeddings::OpenAiEmbedding;

fn embedder(server: &MockServer, dimension: usize) -> OpenAiEmbedding {
    let config = OpenAIConfig::new()
        .with_api_key("test-key")
        .with_api_base(format!("{}/v1", server.uri()));
    OpenAiEmbedding::with_config(config, "text-embedding-3-small", dimension)
}

fn reply(vectors: serde_json::Value) -> ResponseTemplate {
    let data: Vec<serde_json::Value> = vectors
        .as_array()
        .unwrap()
        .iter()
        .enumerate()
        .map(|(index, embedding)| {
            json!({"embedding": embedding, "index": index, "object": "embedding"})
        })
        .collect();
    ResponseTemplate::new(200).set_body_json(json!({
        "data": data,
        "model": "text-embedding-3-small",
        "object": "list",
        "usage": {"prompt_tokens": 1, "total_tokens": 1}
    }))
}

#[tokio::test]
async fn openai_embedding_maps_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(reply(json!([[0.1, 0.2, 0.3]])))
        .mount(&server)
        .await;

    let out = embedder(&server, 3).embed("hello").await.unwrap();
    assert_eq!(out, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn batch_keeps_input_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(body_partial_json(json!({"input": ["first", "second"]})))
        .respond_with(reply(json!([[1.0, 0.0], [0.0, 1.0]])))
        .expect(1)
        .mount(&server)
        .await;

    let texts = vec!["first".to_string(), "second".to_string()];
    let out = embedder(&server, 2).embed_batch(&texts).await.unwrap();
    assert_eq!(out, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
}

#[tokio::test]
async fn requested_dimensions_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(body_partial_json(json!({"dimensions": 2})))
        .respond_with(reply(json!([[0.6, 0.8]])))
        .expect(1)
        .mount(&server)
        .await;

    let out = embedder(&server, 2)
        .request_dimensions(true)
        .embed("short")
        .await
        .unwrap();
    assert_eq!(out, vec![0.6, 0.8]);
}

#[tokio::test]
async fn wrong_dimension_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(reply(json!([[0.1, 0.2]])))
        .mount(&server)
        .await;

    let err = embedder(&server, 3).embed("hello").await.unwrap_err();
    assert!(matches!(
        err,
        EmbeddingError::InvalidResponse(message) if message == "expected embedding dimension 3, got 2"
    ));
}

#[tokio::test]
async fn missing_vectors_are_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(reply(json!([[0.1]])))
        .mount(&server)
        .await;

    let texts = vec!["a".to_string(), "b".to_string()];
    let err = embedder(&server, 1).embed_batch(&texts).await.unwrap_err();
    assert!(matches!(
        err,
        EmbeddingError::InvalidResponse(message) if message == "expected 2 embeddings, got 1"
    ));
}

#[tokio::test]
async fn rejected_request_maps_to_invalid_input() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "message": "input too long",
                "type": "invalid_request_error",
                "param": null,
                "code": null
            }
        })))
        .mount(&server)
        .await;

    let err = embedder(&server, 3).embed("hello").await.unwrap_err();
    assert!(matches!(
        err,
        EmbeddingError::InvalidInput(message) if message == "input too long"
    ));
}

#[tokio::test]
async fn empty_batch_skips_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(reply(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let out = embedder(&server, 3).embed_batch(&[]).await.unwrap();
    assert!(out.is_empty());
}
