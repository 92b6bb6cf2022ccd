//! Qdrant-backed [`VectorStore`] for Quarry, speaking the Qdrant REST API.

mod config;
mod error;
pub mod filter;
pub mod mapper;

use std::fmt;
use std::time::Duration;

use quarry_core::{Document, MetadataFilter, SearchResult, StoreError, VectorStore};
use serde::Deserialize;
use serde_json::Value as JsonValue;

pub use config::{QdrantStoreBuilder, DEFAULT_UPSERT_BATCH_SIZE};
pub use error::QdrantStoreError;
use filter::to_qdrant_filter;
use mapper::{
    doc_to_point, scored_point_to_result, ApiResponse, CollectionInfo, CountPointsRequest,
    CountResult, CreateCollectionRequest, Point, ScoredPoint, SearchPointsRequest,
    UpsertPointsRequest, VectorParams,
};

#[derive(Clone)]
pub struct QdrantVectorStore {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    api_key: Option<String>,
    dimension: Option<usize>,
    upsert_batch_size: usize,
    timeout: Option<Duration>,
}

impl fmt::Debug for QdrantVectorStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_key = if self.api_key.is_some() {
            "<redacted>"
        } else {
            "<none>"
        };

        f.debug_struct("QdrantVectorStore")
            .field("base_url", &self.base_url)
            .field("collection", &self.collection)
            .field("api_key", &api_key)
            .field("dimension", &self.dimension)
            .field("upsert_batch_size", &self.upsert_batch_size)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl QdrantVectorStore {
    pub fn builder() -> QdrantStoreBuilder {
        QdrantStoreBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn upsert_batch_size(&self) -> usize {
        self.upsert_batch_size
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Creates the collection with cosine distance if it does not exist.
    ///
    /// An existing collection is accepted only if its vector size equals
    /// `dimension`.
    pub async fn ensure_collection(&self, dimension: usize) -> Result<(), QdrantStoreError> {
        let path = format!("collections/{}", self.collection);
        let existing: Result<ApiResponse<CollectionInfo>, QdrantStoreError> = self
            .send_and_decode(self.request_builder(reqwest::Method::GET, &path))
            .await;

        match existing {
            Ok(info) => {
                let actual = info.result.config.params.vectors.size;
                if actual != dimension {
                    return Err(QdrantStoreError::CollectionDimensionMismatch {
                        collection: self.collection.clone(),
                        expected: dimension,
                        actual,
                    });
                }
                tracing::debug!(collection = %self.collection, dimension, "collection exists");
                Ok(())
            }
            Err(QdrantStoreError::CollectionNotFound { .. }) => {
                let request = CreateCollectionRequest {
                    vectors: VectorParams {
                        size: dimension,
                        distance: "Cosine".to_string(),
                    },
                };
                let _: ApiResponse<JsonValue> = self
                    .send_and_decode(
                        self.request_builder(reqwest::Method::PUT, &path)
                            .json(&request),
                    )
                    .await?;
                tracing::info!(collection = %self.collection, dimension, "created collection");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn check_dimension(&self, got: usize) -> Result<(), QdrantStoreError> {
        match self.dimension {
            Some(expected) if expected != got => {
                Err(QdrantStoreError::DimensionMismatch { expected, got })
            }
            _ => Ok(()),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn request_builder(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let request = self.client.request(method, self.endpoint(path));

        if let Some(api_key) = self.api_key() {
            request.header("api-key", api_key)
        } else {
            request
        }
    }

    async fn send_and_decode<T: for<'de> Deserialize<'de>>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, QdrantStoreError> {
        let response = request.send().await.map_err(QdrantStoreError::from)?;
        let status = response.status();
        let body = response.text().await.map_err(QdrantStoreError::from)?;

        if !status.is_success() {
            return Err(self.http_error_from_response(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|err| QdrantStoreError::InvalidResponse {
            message: format!("failed to decode qdrant response body: {err}"),
        })
    }

    fn http_error_from_response(&self, status: u16, body: &str) -> QdrantStoreError {
        let message = qdrant_error_message(body);
        if status == 404 && message.to_lowercase().contains("collection") {
            return QdrantStoreError::CollectionNotFound {
                collection: self.collection.clone(),
                message,
            };
        }

        QdrantStoreError::HttpStatus { status, message }
    }

    async fn upsert_points(&self, points: Vec<Point>) -> Result<(), QdrantStoreError> {
        let request = UpsertPointsRequest { points };
        let _: ApiResponse<JsonValue> = self
            .send_and_decode(
                self.request_builder(
                    reqwest::Method::PUT,
                    &format!("collections/{}/points?wait=true", self.collection),
                )
                .json(&request),
            )
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl VectorStore for QdrantVectorStore {
    async fn upsert(&self, docs: Vec<Document>) -> Result<(), StoreError> {
        if docs.is_empty() {
            return Ok(());
        }

        let expected = self.dimension.unwrap_or(docs[0].embedding.len());
        for doc in &docs {
            if doc.embedding.len() != expected {
                return Err(QdrantStoreError::DimensionMismatch {
                    expected,
                    got: doc.embedding.len(),
                }
                .into());
            }
        }

        let points = docs
            .into_iter()
            .map(doc_to_point)
            .collect::<Result<Vec<Point>, QdrantStoreError>>()
            .map_err(StoreError::from)?;

        // Each chunk is one request; earlier chunks stay written if a later one fails.
        let mut committed: Vec<String> = Vec::with_capacity(points.len());
        for chunk in points.chunks(self.upsert_batch_size) {
            let ids: Vec<String> = chunk.iter().map(|point| point.id.as_string()).collect();
            if let Err(err) = self.upsert_points(chunk.to_vec()).await {
                tracing::warn!(
                    collection = %self.collection,
                    committed = committed.len(),
                    error = %err,
                    "qdrant upsert failed"
                );
                if committed.is_empty() {
                    return Err(err.into());
                }
                return Err(StoreError::PartialWrite {
                    committed,
                    source: Box::new(err),
                });
            }
            committed.extend(ids);
        }

        tracing::debug!(collection = %self.collection, count = committed.len(), "upserted points");
        Ok(())
    }

    async fn query(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>, StoreError> {
        if query_embedding.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        self.check_dimension(query_embedding.len())
            .map_err(StoreError::from)?;

        let qdrant_filter = match filter {
            Some(filter) => Some(to_qdrant_filter(filter).map_err(StoreError::from)?),
            None => None,
        };

        let request = SearchPointsRequest {
            vector: query_embedding.to_vec(),
            limit: top_k,
            with_payload: true,
            filter: qdrant_filter,
        };

        let response: ApiResponse<Vec<ScoredPoint>> = self
            .send_and_decode(
                self.request_builder(
                    reqwest::Method::POST,
                    &format!("collections/{}/points/search", self.collection),
                )
                .json(&request),
            )
            .await
            .map_err(StoreError::from)?;

        let mut results = response
            .result
            .into_iter()
            .map(scored_point_to_result)
            .collect::<Result<Vec<SearchResult>, QdrantStoreError>>()
            .map_err(StoreError::from)?;

        results.sort_by(|left, right| {
            right
                .score
                .total_cmp(&left.score)
                .then(left.document.sequence.cmp(&right.document.sequence))
        });
        results.truncate(top_k);
        Ok(results)
    }

    async fn count(&self) -> Result<Option<usize>, StoreError> {
        let response: ApiResponse<CountResult> = self
            .send_and_decode(
                self.request_builder(
                    reqwest::Method::POST,
                    &format!("collections/{}/points/count", self.collection),
                )
                .json(&CountPointsRequest { exact: true }),
            )
            .await
            .map_err(StoreError::from)?;
        Ok(Some(response.result.count))
    }
}

#[derive(Debug, Deserialize)]
struct QdrantErrorEnvelope {
    status: QdrantErrorStatus,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QdrantErrorStatus {
    Message(String),
    Structured { error: String },
}

fn qdrant_error_message(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "unknown qdrant error".to_string();
    }

    serde_json::from_str::<QdrantErrorEnvelope>(trimmed)
        .map(|envelope| match envelope.status {
            QdrantErrorStatus::Message(message) => message,
            QdrantErrorStatus::Structured { error } => error,
        })
        .unwrap_or_else(|_| trimmed.to_string())
}
