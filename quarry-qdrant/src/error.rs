use quarry_core::{FilterError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QdrantStoreError {
    #[error("invalid configuration: base_url is required")]
    MissingBaseUrl,
    #[error("invalid configuration: base_url cannot be empty")]
    EmptyBaseUrl,
    #[error("invalid configuration: collection is required")]
    MissingCollection,
    #[error("invalid configuration: collection cannot be empty")]
    EmptyCollection,
    #[error("invalid configuration: upsert_batch_size must be greater than zero")]
    InvalidBatchSize,
    #[error("invalid document id: {0}")]
    InvalidDocumentId(String),
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("qdrant point '{point_id}' is missing content payload 'content'")]
    MissingContentPayload { point_id: String },
    #[error(
        "qdrant point '{point_id}' has invalid content payload type: expected {expected}, got {actual}"
    )]
    InvalidContentPayloadType {
        point_id: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("qdrant point '{point_id}' has non-string metadata '{key}' ({actual})")]
    InvalidMetadataPayload {
        point_id: String,
        key: String,
        actual: &'static str,
    },
    #[error("qdrant point '{point_id}' has invalid sequence payload ({actual})")]
    InvalidSequencePayload {
        point_id: String,
        actual: &'static str,
    },
    #[error("metadata key {0:?} cannot be addressed in a qdrant filter")]
    UnsupportedFilterKey(String),
    #[error("invalid metadata filter: {0}")]
    InvalidFilter(#[from] FilterError),
    #[error("qdrant request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("collection '{collection}' not found: {message}")]
    CollectionNotFound { collection: String, message: String },
    #[error("collection '{collection}' stores vectors of size {actual}, expected {expected}")]
    CollectionDimensionMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },
    #[error("qdrant returned HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },
    #[error("invalid qdrant response: {message}")]
    InvalidResponse { message: String },
}

impl From<QdrantStoreError> for StoreError {
    fn from(value: QdrantStoreError) -> Self {
        match value {
            QdrantStoreError::InvalidDocumentId(id) => StoreError::InvalidId(id),
            QdrantStoreError::DimensionMismatch { expected, got } => {
                StoreError::DimensionMismatch { expected, got }
            }
            QdrantStoreError::Request(err) => StoreError::Unavailable(err.to_string()),
            QdrantStoreError::HttpStatus { status, message } if status >= 500 => {
                StoreError::Unavailable(format!("qdrant returned HTTP {status}: {message}"))
            }
            other => StoreError::Internal(Box::new(other)),
        }
    }
}
