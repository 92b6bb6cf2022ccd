use crate::RetrievalError;

pub const DEFAULT_TOP_K: usize = 4;
pub const DEFAULT_MAX_TOP_K: usize = 100;
pub const DEFAULT_OVERFETCH_FACTOR: usize = 4;

/// Limits applied by [`SearchEngine`](crate::SearchEngine).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchConfig {
    /// Requests above this are clamped down to it.
    pub max_top_k: usize,
    /// Candidate multiplier when the index cannot filter natively.
    pub overfetch_factor: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_top_k: DEFAULT_MAX_TOP_K,
            overfetch_factor: DEFAULT_OVERFETCH_FACTOR,
        }
    }
}

impl SearchConfig {
    pub fn new(max_top_k: usize, overfetch_factor: usize) -> Result<Self, RetrievalError> {
        if max_top_k == 0 {
            return Err(RetrievalError::invalid("max_top_k must be greater than zero"));
        }
        if overfetch_factor == 0 {
            return Err(RetrievalError::invalid(
                "overfetch_factor must be greater than zero",
            ));
        }
        Ok(Self {
            max_top_k,
            overfetch_factor,
        })
    }
}

/// Batching applied by [`DocumentStore`](crate::DocumentStore) when embedding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexingConfig {
    /// Texts sent to the provider per `embed_batch` call.
    pub embed_batch_size: usize,
    /// Embedding calls allowed in flight for one `add_documents`.
    pub embed_concurrency: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            embed_batch_size: 64,
            embed_concurrency: 4,
        }
    }
}

impl IndexingConfig {
    pub fn new(embed_batch_size: usize, embed_concurrency: usize) -> Result<Self, RetrievalError> {
        if embed_batch_size == 0 {
            return Err(RetrievalError::invalid(
                "embed_batch_size must be greater than zero",
            ));
        }
        if embed_concurrency == 0 {
            return Err(RetrievalError::invalid(
                "embed_concurrency must be greater than zero",
            ));
        }
        Ok(Self {
            embed_batch_size,
            embed_concurrency,
        })
    }
}
