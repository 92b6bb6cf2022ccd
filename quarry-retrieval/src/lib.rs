//! Document store and search engine for Quarry, plus in-process test
//! doubles for the embedding and index collaborators.

mod config;
mod document_store;
mod error;
mod hash_embedder;
mod in_memory;
mod options;
mod search_engine;

pub use config::{
    IndexingConfig, SearchConfig, DEFAULT_MAX_TOP_K, DEFAULT_OVERFETCH_FACTOR, DEFAULT_TOP_K,
};
pub use document_store::DocumentStore;
pub use error::{ErrorKind, RetrievalError, RetrievalResult};
pub use hash_embedder::HashEmbedder;
pub use in_memory::InMemoryVectorStore;
pub use options::CallOptions;
pub use search_engine::{SearchEngine, SearchRequest};
pub use tokio_util::sync::CancellationToken;
