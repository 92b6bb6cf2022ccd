use std::sync::Arc;

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use clap::Parser;
use quarry_embeddings::{OllamaEmbedding, OpenAiEmbedding, DEFAULT_OLLAMA_URL};
use quarry_qdrant::QdrantVectorStore;
use quarry_retrieval::{HashEmbedder, InMemoryVectorStore};
use quarry_server::config::{IndexKind, ProviderKind};
use quarry_server::state::{SharedEmbedding, SharedStore};
use quarry_server::{app, seed, telemetry, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    telemetry::init(&config.log).map_err(|err| anyhow::anyhow!(err))?;
    tracing::debug!(?config, "configuration loaded");

    let settings = config.settings().context("invalid configuration")?;
    let embedder = build_embedder(&config)?;
    let store = build_store(&config).await?;
    let state = AppState::new(embedder, store, settings);

    if config.skip_seed {
        tracing::info!("seeding skipped");
    } else {
        seed::seed(&state).await.context("seeding documents")?;
    }

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    tracing::info!(addr = %config.bind, provider = ?config.provider, index = ?config.index, "listening");

    axum::serve(listener, app(state, config.limits()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shut down");
    Ok(())
}

fn build_embedder(config: &Config) -> anyhow::Result<SharedEmbedding> {
    let dimension = config.dimension();
    let embedder: SharedEmbedding = match config.provider {
        ProviderKind::Hash => Arc::new(HashEmbedder::new(dimension)),
        ProviderKind::Openai => {
            let api_key = config
                .openai_api_key
                .clone()
                .context("OPENAI_API_KEY is required for the openai provider")?;
            let mut openai = OpenAIConfig::new().with_api_key(api_key);
            if let Some(base_url) = &config.embedding_base_url {
                openai = openai.with_api_base(base_url);
            }
            Arc::new(
                OpenAiEmbedding::with_config(openai, config.model(), dimension)
                    .request_dimensions(config.dimension.is_some()),
            )
        }
        ProviderKind::Ollama => {
            let base_url = config
                .embedding_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
            let mut ollama = OllamaEmbedding::new(base_url, config.model(), dimension);
            if let Some(timeout) = config.request_timeout() {
                ollama = ollama.with_timeout(timeout);
            }
            Arc::new(ollama)
        }
    };
    Ok(embedder)
}

async fn build_store(config: &Config) -> anyhow::Result<SharedStore> {
    let dimension = config.dimension();
    let store: SharedStore = match config.index {
        IndexKind::Memory => Arc::new(InMemoryVectorStore::with_dimension(dimension)),
        IndexKind::Qdrant => {
            let mut builder = QdrantVectorStore::builder()
                .base_url(&config.qdrant_url)
                .collection(&config.qdrant_collection)
                .dimension(dimension);
            if let Some(api_key) = &config.qdrant_api_key {
                builder = builder.api_key(api_key);
            }
            if let Some(timeout) = config.request_timeout() {
                builder = builder.timeout(timeout);
            }
            let store = builder.build().context("configuring qdrant")?;
            store
                .ensure_collection(dimension)
                .await
                .with_context(|| format!("preparing collection {}", config.qdrant_collection))?;
            Arc::new(store)
        }
    };
    Ok(store)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(%error, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::warn!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
