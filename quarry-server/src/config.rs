use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use quarry_retrieval::{
    IndexingConfig, RetrievalError, SearchConfig, DEFAULT_MAX_TOP_K, DEFAULT_OVERFETCH_FACTOR,
    DEFAULT_TOP_K,
};

use crate::{ServerLimits, Settings, DEFAULT_BODY_LIMIT, DEFAULT_CONCURRENCY_LIMIT};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    /// Token feature hashing, in process. For development and tests.
    Hash,
    Openai,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum IndexKind {
    Memory,
    Qdrant,
}

#[derive(Clone, Parser)]
#[command(
    name = "quarry",
    version,
    about = "Semantic search over pluggable embedding providers and vector indexes"
)]
pub struct Config {
    #[arg(long, env = "QUARRY_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Default log filter; RUST_LOG overrides it.
    #[arg(long, env = "QUARRY_LOG", default_value = "info,tower_http=debug")]
    pub log: String,

    #[arg(long, env = "QUARRY_EMBEDDING_PROVIDER", value_enum, default_value_t = ProviderKind::Hash)]
    pub provider: ProviderKind,

    /// Defaults to a provider-specific model.
    #[arg(long, env = "QUARRY_EMBEDDING_MODEL")]
    pub model: Option<String>,

    /// Defaults to the chosen model's native size.
    #[arg(long, env = "QUARRY_EMBEDDING_DIMENSION")]
    pub dimension: Option<usize>,

    #[arg(long, env = "QUARRY_EMBEDDING_BASE_URL")]
    pub embedding_base_url: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "QUARRY_INDEX", value_enum, default_value_t = IndexKind::Memory)]
    pub index: IndexKind,

    #[arg(long, env = "QUARRY_QDRANT_URL", default_value = "http://localhost:6333")]
    pub qdrant_url: String,

    #[arg(long, env = "QUARRY_QDRANT_COLLECTION", default_value = "quarry")]
    pub qdrant_collection: String,

    #[arg(long, env = "QDRANT_API_KEY", hide_env_values = true)]
    pub qdrant_api_key: Option<String>,

    #[arg(long, env = "QUARRY_DEFAULT_TOP_K", default_value_t = DEFAULT_TOP_K)]
    pub default_top_k: usize,

    #[arg(long, env = "QUARRY_MAX_TOP_K", default_value_t = DEFAULT_MAX_TOP_K)]
    pub max_top_k: usize,

    #[arg(long, env = "QUARRY_OVERFETCH_FACTOR", default_value_t = DEFAULT_OVERFETCH_FACTOR)]
    pub overfetch_factor: usize,

    #[arg(long, env = "QUARRY_EMBED_BATCH_SIZE", default_value_t = 64)]
    pub embed_batch_size: usize,

    #[arg(long, env = "QUARRY_EMBED_CONCURRENCY", default_value_t = 4)]
    pub embed_concurrency: usize,

    /// Per-request deadline in seconds; 0 disables it.
    #[arg(long, env = "QUARRY_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    #[arg(long, env = "QUARRY_BODY_LIMIT", default_value_t = DEFAULT_BODY_LIMIT)]
    pub body_limit: usize,

    #[arg(long, env = "QUARRY_CONCURRENCY_LIMIT", default_value_t = DEFAULT_CONCURRENCY_LIMIT)]
    pub concurrency_limit: usize,

    #[arg(long, env = "QUARRY_SKIP_SEED")]
    pub skip_seed: bool,
}

impl Config {
    pub fn model(&self) -> String {
        if let Some(model) = &self.model {
            return model.clone();
        }
        match self.provider {
            ProviderKind::Hash => "hash".to_string(),
            ProviderKind::Openai => "text-embedding-3-small".to_string(),
            ProviderKind::Ollama => "nomic-embed-text".to_string(),
        }
    }

    pub fn dimension(&self) -> usize {
        if let Some(dimension) = self.dimension {
            return dimension;
        }
        match self.provider {
            ProviderKind::Hash => 384,
            ProviderKind::Openai => 1536,
            ProviderKind::Ollama => 768,
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn settings(&self) -> Result<Settings, RetrievalError> {
        if self.default_top_k == 0 {
            return Err(RetrievalError::invalid(
                "default_top_k must be greater than zero",
            ));
        }
        if self.dimension() == 0 {
            return Err(RetrievalError::invalid("dimension must be greater than zero"));
        }
        Ok(Settings {
            default_top_k: self.default_top_k,
            search: SearchConfig::new(self.max_top_k, self.overfetch_factor)?,
            indexing: IndexingConfig::new(self.embed_batch_size, self.embed_concurrency)?,
            request_timeout: self.request_timeout(),
        })
    }

    pub fn limits(&self) -> ServerLimits {
        ServerLimits {
            body_limit: self.body_limit,
            concurrency_limit: self.concurrency_limit.max(1),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |key: &Option<String>| if key.is_some() { "<redacted>" } else { "<none>" };
        f.debug_struct("Config")
            .field("bind", &self.bind)
            .field("provider", &self.provider)
            .field("model", &self.model())
            .field("dimension", &self.dimension())
            .field("embedding_base_url", &self.embedding_base_url)
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("index", &self.index)
            .field("qdrant_url", &self.qdrant_url)
            .field("qdrant_collection", &self.qdrant_collection)
            .field("qdrant_api_key", &redact(&self.qdrant_api_key))
            .field("default_top_k", &self.default_top_k)
            .field("max_top_k", &self.max_top_k)
            .field("request_timeout", &self.request_timeout())
            .field("skip_seed", &self.skip_seed)
            .finish()
    }
}
