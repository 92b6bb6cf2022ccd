use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quarry_core::{
    Document, Embedding, EmbeddingError, MetadataFilter, NewDocument, SearchResult, StoreError,
    VectorStore,
};
use quarry_retrieval::{
    DocumentStore, ErrorKind, HashEmbedder, InMemoryVectorStore, RetrievalError, SearchConfig,
    SearchEngine, SearchRequest,
};

const DIMENSION: usize = 64;

struct FailingEmbedder;

#[async_trait]
impl Embedding for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Provider("upstream 500".to_string()))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Provider("upstream 500".to_string()))
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }
}

/// Counts queries and can be told to fail them.
#[derive(Clone, Default)]
struct ProbeStore {
    inner: InMemoryVectorStore,
    queries: Arc<AtomicUsize>,
    fail: bool,
}

#[async_trait]
impl VectorStore for ProbeStore {
    async fn upsert(&self, docs: Vec<Document>) -> Result<(), StoreError> {
        self.inner.upsert(docs).await
    }

    async fn query(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        self.inner.query(query_embedding, top_k, filter).await
    }
}

/// An index that ignores filters, as some remote indexes do.
#[derive(Clone, Default)]
struct UnfilteredStore {
    inner: InMemoryVectorStore,
    requested: Arc<Mutex<Vec<(usize, bool)>>>,
}

#[async_trait]
impl VectorStore for UnfilteredStore {
    async fn upsert(&self, docs: Vec<Document>) -> Result<(), StoreError> {
        self.inner.upsert(docs).await
    }

    async fn query(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>, StoreError> {
        self.requested
            .lock()
            .unwrap()
            .push((top_k, filter.is_some()));
        self.inner.query(query_embedding, top_k, None).await
    }

    fn supports_filters(&self) -> bool {
        false
    }
}

fn animals_and_stocks() -> Vec<NewDocument> {
    vec![
        NewDocument::new("cats are mammals").with_metadata("category", "bio"),
        NewDocument::new("dogs are mammals").with_metadata("category", "bio"),
        NewDocument::new("stocks rose today").with_metadata("category", "finance"),
    ]
}

async fn seeded<S>(store: S) -> (Vec<String>, SearchEngine<HashEmbedder, S>)
where
    S: VectorStore + Clone,
{
    let embedder = HashEmbedder::new(DIMENSION);
    let documents = DocumentStore::new(embedder.clone(), store.clone());
    let ids = documents
        .add_documents(animals_and_stocks())
        .await
        .unwrap();
    (ids, SearchEngine::new(embedder, store))
}

fn ids(hits: &[SearchResult]) -> Vec<&str> {
    hits.iter().map(|hit| hit.document.id.as_str()).collect()
}

#[tokio::test]
async fn search_returns_related_documents_only() {
    let (added, engine) = seeded(InMemoryVectorStore::new()).await;

    let hits = engine
        .search(&SearchRequest::new("mammals", 2))
        .await
        .unwrap();

    assert_eq!(hits.len(), 2);
    let mut found = ids(&hits);
    found.sort();
    let mut expected = vec![added[0].as_str(), added[1].as_str()];
    expected.sort();
    assert_eq!(found, expected);
    assert!(hits
        .iter()
        .all(|hit| hit.document.metadata.get("category").map(String::as_str) == Some("bio")));
}

#[tokio::test]
async fn filtered_search_for_absent_value_returns_empty() {
    let (_, engine) = seeded(InMemoryVectorStore::new()).await;

    let request = SearchRequest::new("mammals", 2)
        .with_filter(MetadataFilter::eq("category", "finance"));
    let hits = engine.search(&request).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document.content, "stocks rose today");

    let request =
        SearchRequest::new("mammals", 2).with_filter(MetadataFilter::eq("category", "sports"));
    assert!(engine.search(&request).await.unwrap().is_empty());
}

#[tokio::test]
async fn min_score_drops_unrelated_filtered_hits() {
    let (_, engine) = seeded(InMemoryVectorStore::new()).await;

    let request = SearchRequest::new("mammals", 2)
        .with_filter(MetadataFilter::eq("category", "finance"))
        .with_min_score(0.1);
    assert!(engine.search(&request).await.unwrap().is_empty());

    let request = SearchRequest::new("mammals", 2).with_min_score(0.1);
    assert_eq!(engine.search(&request).await.unwrap().len(), 2);

    let request = SearchRequest::new("mammals", 2).with_min_score(f32::NAN);
    let err = engine.search(&request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn filtered_search_only_returns_matching_metadata() {
    let (added, engine) = seeded(InMemoryVectorStore::new()).await;

    let request =
        SearchRequest::new("stocks rose today", 3).with_filter(MetadataFilter::eq("category", "bio"));
    let hits = engine.search(&request).await.unwrap();

    assert_eq!(ids(&hits), vec![added[0].as_str(), added[1].as_str()]);
}

#[tokio::test]
async fn exact_text_ranks_first_and_results_are_sorted() {
    let (added, engine) = seeded(InMemoryVectorStore::new()).await;

    for (id, text) in added.iter().zip(["cats are mammals", "dogs are mammals", "stocks rose today"]) {
        let hits = engine.search(&SearchRequest::new(text, 3)).await.unwrap();
        assert_eq!(&hits[0].document.id, id);
        assert!((hits[0].score - 1.0).abs() < 1e-5);
        assert!(hits.windows(2).all(|pair| pair[0].score >= pair[1].score));
    }
}

#[tokio::test]
async fn short_result_sets_are_not_padded() {
    let (_, engine) = seeded(InMemoryVectorStore::new()).await;

    let hits = engine
        .search(&SearchRequest::new("mammals", 50))
        .await
        .unwrap();
    assert_eq!(hits.len(), 3);
}

#[tokio::test]
async fn search_on_empty_index_returns_empty_list() {
    let engine = SearchEngine::new(HashEmbedder::new(DIMENSION), InMemoryVectorStore::new());
    let hits = engine
        .search(&SearchRequest::new("anything", 4))
        .await
        .unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn repeated_search_is_identical() {
    let (_, engine) = seeded(InMemoryVectorStore::new()).await;
    let request = SearchRequest::new("are mammals today", 3);

    let first = engine.search(&request).await.unwrap();
    let second = engine.search(&request).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn metadata_strings_round_trip_unchanged() {
    let store = InMemoryVectorStore::new();
    let embedder = HashEmbedder::new(DIMENSION);
    let documents = DocumentStore::new(embedder.clone(), store.clone());
    documents
        .add_documents(vec![NewDocument::new("odd metadata")
            .with_metadata("count", "007")
            .with_metadata("flag", "true")
            .with_metadata("note", " padded ")])
        .await
        .unwrap();

    let engine = SearchEngine::new(embedder, store);
    let hits = engine
        .search(&SearchRequest::new("odd metadata", 1))
        .await
        .unwrap();
    let metadata = &hits[0].document.metadata;
    assert_eq!(metadata["count"], "007");
    assert_eq!(metadata["flag"], "true");
    assert_eq!(metadata["note"], " padded ");
}

#[tokio::test]
async fn search_rejects_invalid_arguments() {
    let (_, engine) = seeded(InMemoryVectorStore::new()).await;

    let empty = engine.search(&SearchRequest::new("", 4)).await.unwrap_err();
    assert_eq!(empty.kind(), ErrorKind::InvalidArgument);

    let blank = engine.search(&SearchRequest::new("   ", 4)).await.unwrap_err();
    assert_eq!(blank.kind(), ErrorKind::InvalidArgument);

    let zero = engine.search(&SearchRequest::new("x", 0)).await.unwrap_err();
    assert!(matches!(zero, RetrievalError::InvalidArgument(message) if message.contains("top_k")));

    let bad_filter = SearchRequest::new("x", 4).with_filter(MetadataFilter::eq("", "bio"));
    let err = engine.search(&bad_filter).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn search_clamps_top_k_to_configured_maximum() {
    let (_, engine) = seeded(InMemoryVectorStore::new()).await;
    let engine = engine.with_config(SearchConfig::new(2, 4).unwrap());

    let hits = engine
        .search(&SearchRequest::new("mammals", 1000))
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);
}

#[tokio::test]
async fn embedding_failure_skips_index_query() {
    let store = ProbeStore::default();
    let engine = SearchEngine::new(FailingEmbedder, store.clone());

    let err = engine
        .search(&SearchRequest::new("mammals", 4))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::EmbeddingFailure);
    assert_eq!(store.queries.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn index_failure_is_reported_not_hidden() {
    let store = ProbeStore {
        fail: true,
        ..ProbeStore::default()
    };
    let engine = SearchEngine::new(HashEmbedder::new(DIMENSION), store.clone());

    let err = engine
        .search(&SearchRequest::new("mammals", 4))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RetrievalError::IndexQueryFailure(StoreError::Unavailable(_))
    ));
    assert!(err.is_retryable());
    assert_eq!(store.queries.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn client_side_filter_overfetches_when_index_cannot_filter() {
    let store = UnfilteredStore::default();
    let (added, engine) = seeded(store.clone()).await;

    let request = SearchRequest::new("mammals", 1).with_filter(MetadataFilter::eq("category", "finance"));
    let hits = engine.search(&request).await.unwrap();

    assert_eq!(ids(&hits), vec![added[2].as_str()]);
    assert_eq!(store.requested.lock().unwrap().as_slice(), &[(4, false)]);
}
