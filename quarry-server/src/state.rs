use std::sync::Arc;
use std::time::Duration;

use quarry_core::{Embedding, VectorStore};
use quarry_retrieval::{
    CallOptions, DocumentStore, IndexingConfig, SearchConfig, SearchEngine, DEFAULT_TOP_K,
};

pub type SharedEmbedding = Arc<dyn Embedding>;
pub type SharedStore = Arc<dyn VectorStore>;

/// Tunables for the handlers and the core they drive.
#[derive(Clone, Debug)]
pub struct Settings {
    pub default_top_k: usize,
    pub search: SearchConfig,
    pub indexing: IndexingConfig,
    /// Applied to each request as a core deadline. `None` never times out.
    pub request_timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_top_k: DEFAULT_TOP_K,
            search: SearchConfig::default(),
            indexing: IndexingConfig::default(),
            request_timeout: None,
        }
    }
}

/// Process-wide handles shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub documents: Arc<DocumentStore<SharedEmbedding, SharedStore>>,
    pub engine: Arc<SearchEngine<SharedEmbedding, SharedStore>>,
    pub store: SharedStore,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(embedder: SharedEmbedding, store: SharedStore, settings: Settings) -> Self {
        let documents = DocumentStore::new(embedder.clone(), store.clone())
            .with_config(settings.indexing);
        let engine = SearchEngine::new(embedder, store.clone()).with_config(settings.search);
        Self {
            documents: Arc::new(documents),
            engine: Arc::new(engine),
            store,
            settings: Arc::new(settings),
        }
    }

    pub fn call_options(&self) -> CallOptions {
        match self.settings.request_timeout {
            Some(timeout) => CallOptions::new().with_timeout(timeout),
            None => CallOptions::new(),
        }
    }
}
