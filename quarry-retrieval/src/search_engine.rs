use quarry_core::{Embedding, EmbeddingError, MetadataFilter, SearchResult, VectorStore};
use tracing::Instrument;

use crate::{CallOptions, RetrievalError, RetrievalResult, SearchConfig};

#[derive(Clone, Debug, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: usize,
    pub filter: Option<MetadataFilter>,
    /// Hits scoring below this are dropped. `None` accepts every score.
    pub min_score: Option<f32>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            top_k,
            filter: None,
            min_score: None,
        }
    }

    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SearchPhase {
    EmbeddingQuery,
    QueryingIndex,
    Filtering,
    Ranked,
}

impl SearchPhase {
    fn enter(self) {
        tracing::trace!(phase = ?self, "search phase");
    }
}

/// Answers similarity queries against a vector index.
///
/// Each call embeds the query, asks the index for candidates, applies the
/// metadata filter and returns at most `top_k` hits by descending score.
/// Requests share no state beyond the embedder and index handles.
pub struct SearchEngine<E, S> {
    embedder: E,
    store: S,
    config: SearchConfig,
}

impl<E, S> SearchEngine<E, S>
where
    E: Embedding,
    S: VectorStore,
{
    pub fn new(embedder: E, store: S) -> Self {
        Self {
            embedder,
            store,
            config: SearchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn search(&self, request: &SearchRequest) -> RetrievalResult<Vec<SearchResult>> {
        self.search_with(request, &CallOptions::default()).await
    }

    pub async fn search_with(
        &self,
        request: &SearchRequest,
        options: &CallOptions,
    ) -> RetrievalResult<Vec<SearchResult>> {
        let span = tracing::info_span!(
            "search",
            top_k = request.top_k,
            filtered = request.filter.is_some(),
        );
        let result = self.execute(request, options).instrument(span).await;
        match &result {
            Ok(hits) => tracing::debug!(hits = hits.len(), "search returned"),
            Err(error) => tracing::debug!(kind = error.kind().as_str(), %error, "search errored"),
        }
        result
    }

    async fn execute(
        &self,
        request: &SearchRequest,
        options: &CallOptions,
    ) -> RetrievalResult<Vec<SearchResult>> {
        let top_k = self.effective_top_k(request)?;
        let filter = request.filter.as_ref();

        SearchPhase::EmbeddingQuery.enter();
        let embedding = options
            .run(async {
                self.embedder
                    .embed(&request.query)
                    .await
                    .map_err(RetrievalError::from)
            })
            .await?;
        let dimension = self.embedder.dimension();
        if embedding.len() != dimension {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected embedding dimension {}, got {}",
                dimension,
                embedding.len()
            ))
            .into());
        }

        SearchPhase::QueryingIndex.enter();
        let (fetch_k, index_filter) = match filter {
            Some(filter) if self.store.supports_filters() => (top_k, Some(filter)),
            Some(_) => (top_k.saturating_mul(self.config.overfetch_factor), None),
            None => (top_k, None),
        };
        let mut hits = options
            .run(async {
                self.store
                    .query(&embedding, fetch_k, index_filter)
                    .await
                    .map_err(RetrievalError::IndexQueryFailure)
            })
            .await?;

        if let Some(filter) = filter {
            SearchPhase::Filtering.enter();
            hits.retain(|hit| filter.matches(&hit.document.metadata));
        }
        if let Some(min_score) = request.min_score {
            hits.retain(|hit| hit.score >= min_score);
        }

        // Equal scores rank by insertion sequence. The sort is stable, so
        // unstamped hits keep the index's order.
        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.document.sequence.cmp(&b.document.sequence))
        });
        hits.truncate(top_k);
        SearchPhase::Ranked.enter();
        Ok(hits)
    }

    fn effective_top_k(&self, request: &SearchRequest) -> RetrievalResult<usize> {
        if request.query.trim().is_empty() {
            return Err(RetrievalError::invalid("query must not be empty"));
        }
        if request.top_k == 0 {
            return Err(RetrievalError::invalid("top_k must be greater than zero"));
        }
        if let Some(filter) = &request.filter {
            filter.validate()?;
        }
        if request.min_score.map_or(false, |score| !score.is_finite()) {
            return Err(RetrievalError::invalid("min_score must be a finite number"));
        }
        if request.top_k > self.config.max_top_k {
            tracing::debug!(
                requested = request.top_k,
                max = self.config.max_top_k,
                "clamping top_k"
            );
            return Ok(self.config.max_top_k);
        }
        Ok(request.top_k)
    }
}
