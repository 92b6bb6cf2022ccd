use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::{Document, DocumentView, MetadataFilter, StoreError};

/// A scored hit returned by a vector index.
///
/// `score` is a similarity where higher means closer; both bundled indexes
/// report cosine similarity in `[-1, 1]`.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SearchResult {
    pub document: DocumentView,
    pub score: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Writes a batch of embedded documents. Existing ids are overwritten.
    ///
    /// Implementations that cannot commit a batch atomically must report the
    /// ids that did land through [`StoreError::PartialWrite`].
    async fn upsert(&self, docs: Vec<Document>) -> Result<(), StoreError>;

    /// Returns up to `top_k` hits ordered by descending score.
    async fn query(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>, StoreError>;

    /// Whether `query` honours the filter argument natively.
    fn supports_filters(&self) -> bool {
        true
    }

    /// Number of stored documents, when the index can report it cheaply.
    async fn count(&self) -> Result<Option<usize>, StoreError> {
        Ok(None)
    }
}

#[async_trait]
impl<T> VectorStore for Arc<T>
where
    T: VectorStore + ?Sized,
{
    async fn upsert(&self, docs: Vec<Document>) -> Result<(), StoreError> {
        (**self).upsert(docs).await
    }

    async fn query(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>, StoreError> {
        (**self).query(query_embedding, top_k, filter).await
    }

    fn supports_filters(&self) -> bool {
        (**self).supports_filters()
    }

    async fn count(&self) -> Result<Option<usize>, StoreError> {
        (**self).count().await
    }
}
