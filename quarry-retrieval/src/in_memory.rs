use std::collections::HashMap;
use std::sync::Arc;

use quarry_core::{Document, MetadataFilter, SearchResult, StoreError, VectorStore};
use tokio::sync::RwLock;

#[derive(Default)]
struct StoreInner {
    docs: Vec<Document>,
    id_map: HashMap<String, usize>,
    dimension: Option<usize>,
}

/// Exact cosine-similarity index held in process memory.
///
/// Batches are validated in full before anything is written, so an `upsert`
/// either lands completely or not at all. Hits with equal scores come back in
/// insertion order, by `sequence` and then by first write.
#[derive(Clone, Default)]
pub struct InMemoryVectorStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins the accepted embedding dimension up front instead of learning it
    /// from the first write.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                dimension: Some(dimension),
                ..StoreInner::default()
            })),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.docs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait::async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, docs: Vec<Document>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;

        let mut dimension = inner.dimension;
        for doc in &docs {
            if doc.id.trim().is_empty() {
                return Err(StoreError::InvalidId(doc.id.clone()));
            }
            let got = doc.embedding.len();
            match dimension {
                Some(expected) if expected != got => {
                    return Err(StoreError::DimensionMismatch { expected, got });
                }
                None => dimension = Some(got),
                _ => {}
            }
        }
        inner.dimension = dimension;

        for doc in docs {
            if let Some(&index) = inner.id_map.get(&doc.id) {
                inner.docs[index] = doc;
            } else {
                let index = inner.docs.len();
                inner.id_map.insert(doc.id.clone(), index);
                inner.docs.push(doc);
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>, StoreError> {
        let inner = self.inner.read().await;
        let expected = inner.dimension.unwrap_or(query_embedding.len());
        if expected != query_embedding.len() {
            return Err(StoreError::DimensionMismatch {
                expected,
                got: query_embedding.len(),
            });
        }

        let mut scored = Vec::new();
        for doc in &inner.docs {
            if let Some(filter) = filter {
                if !filter.matches(&doc.metadata) {
                    continue;
                }
            }
            let mut score = cosine_similarity(query_embedding, &doc.embedding);
            if score.is_nan() {
                score = f32::NEG_INFINITY;
            }
            scored.push(SearchResult {
                document: doc.view(),
                score,
            });
        }

        // Equal scores fall back to the insertion sequence, then storage order.
        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.document.sequence.cmp(&b.document.sequence))
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn count(&self) -> Result<Option<usize>, StoreError> {
        Ok(Some(self.len().await))
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
