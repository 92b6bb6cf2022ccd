use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use futures::future::BoxFuture;
use futures::{stream, FutureExt, StreamExt, TryStreamExt};
use quarry_core::{Document, Embedding, EmbeddingError, NewDocument, VectorStore};
use tracing::Instrument;
use uuid::Uuid;

use crate::{CallOptions, IndexingConfig, RetrievalError, RetrievalResult};

const SEED_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_93d5_4b0f_8e27_c1a9_5d3b_7e60);

/// Hands out insertion sequences: microseconds since the Unix epoch, bumped
/// past the last value issued so they never repeat within a process.
#[derive(Debug, Default)]
struct InsertionClock {
    last: AtomicU64,
}

impl InsertionClock {
    /// Reserves `count` consecutive values and returns the first.
    fn reserve(&self, count: usize) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX));
        let count = count as u64;
        let mut first = 0;
        let _ = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                first = now.max(last.saturating_add(1));
                Some(first.saturating_add(count.saturating_sub(1)))
            });
        first
    }
}

/// Turns caller `(text, metadata)` pairs into embedded, stored documents.
///
/// Ids and insertion sequences are generated here and nowhere else. A batch
/// is embedded, checked against the provider dimension and written to the
/// index with a single `upsert`, so returned ids line up positionally with
/// the input.
pub struct DocumentStore<E, S> {
    embedder: E,
    store: S,
    config: IndexingConfig,
    clock: InsertionClock,
}

impl<E, S> DocumentStore<E, S>
where
    E: Embedding,
    S: VectorStore,
{
    pub fn new(embedder: E, store: S) -> Self {
        Self {
            embedder,
            store,
            config: IndexingConfig::default(),
            clock: InsertionClock::default(),
        }
    }

    pub fn with_config(mut self, config: IndexingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    pub async fn add_documents(&self, items: Vec<NewDocument>) -> RetrievalResult<Vec<String>> {
        self.add_documents_with(items, &CallOptions::default()).await
    }

    pub async fn add_documents_with(
        &self,
        items: Vec<NewDocument>,
        options: &CallOptions,
    ) -> RetrievalResult<Vec<String>> {
        validate_batch(&items)?;
        let ids = items.iter().map(|_| Uuid::new_v4().to_string()).collect();
        let span = tracing::info_span!("add_documents", batch_size = items.len());
        self.embed_and_write(ids, items, options)
            .instrument(span)
            .await
    }

    /// Loads a fixed document set.
    ///
    /// Ids are derived from content and metadata, so seeding the same set again
    /// overwrites the earlier copies instead of duplicating them, including
    /// against an index that outlived the process. Repeats within `items` are
    /// stored once and the returned ids hold one entry per distinct document.
    pub async fn seed(&self, items: Vec<NewDocument>) -> RetrievalResult<Vec<String>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        validate_batch(&items)?;
        let mut seen = HashSet::new();
        let (ids, items): (Vec<String>, Vec<NewDocument>) = items
            .into_iter()
            .map(|item| (seed_id(&item), item))
            .filter(|(id, _)| seen.insert(id.clone()))
            .unzip();
        let span = tracing::info_span!("seed_documents", batch_size = items.len());
        let ids = self
            .embed_and_write(ids, items, &CallOptions::default())
            .instrument(span)
            .await?;
        tracing::info!(count = ids.len(), "seeded documents");
        Ok(ids)
    }

    async fn embed_and_write(
        &self,
        ids: Vec<String>,
        items: Vec<NewDocument>,
        options: &CallOptions,
    ) -> RetrievalResult<Vec<String>> {
        let first_sequence = self.clock.reserve(items.len());
        let texts: Vec<String> = items.iter().map(|item| item.content.clone()).collect();
        let embeddings = options.run(self.embed_all(&texts)).await?;

        let docs: Vec<Document> = ids
            .iter()
            .cloned()
            .zip(items)
            .zip(embeddings)
            .zip(first_sequence..)
            .map(|(((id, item), embedding), sequence)| Document {
                id,
                content: item.content,
                metadata: item.metadata,
                embedding,
                sequence,
            })
            .collect();

        options
            .run(async {
                self.store
                    .upsert(docs)
                    .await
                    .map_err(RetrievalError::index_write)
            })
            .await?;

        tracing::debug!(count = ids.len(), "documents written to index");
        Ok(ids)
    }

    async fn embed_all(&self, texts: &[String]) -> RetrievalResult<Vec<Vec<f32>>> {
        let dimension = self.embedder.dimension();
        let embedder = &self.embedder;
        // Boxed up front so the stream holds no closure borrowing `self`,
        // which keeps the caller's future `Send`.
        let requests: Vec<BoxFuture<'_, Result<Vec<Vec<f32>>, EmbeddingError>>> = texts
            .chunks(self.config.embed_batch_size)
            .map(|chunk| {
                async move {
                    let vectors = embedder.embed_batch(chunk).await?;
                    if vectors.len() != chunk.len() {
                        return Err(EmbeddingError::InvalidResponse(format!(
                            "expected {} embeddings, got {}",
                            chunk.len(),
                            vectors.len()
                        )));
                    }
                    Ok(vectors)
                }
                .boxed()
            })
            .collect();
        let batches: Vec<Vec<Vec<f32>>> = stream::iter(requests)
            .buffered(self.config.embed_concurrency)
            .try_collect()
            .await?;

        let embeddings: Vec<Vec<f32>> = batches.into_iter().flatten().collect();
        if let Some(bad) = embeddings.iter().find(|vector| vector.len() != dimension) {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected embedding dimension {}, got {}",
                dimension,
                bad.len()
            ))
            .into());
        }
        Ok(embeddings)
    }
}

fn validate_batch(items: &[NewDocument]) -> RetrievalResult<()> {
    if items.is_empty() {
        return Err(RetrievalError::invalid("documents must not be empty"));
    }
    for (index, item) in items.iter().enumerate() {
        if item.content.trim().is_empty() {
            return Err(RetrievalError::invalid(format!(
                "document {index} has empty content"
            )));
        }
        if item.metadata.keys().any(|key| key.trim().is_empty()) {
            return Err(RetrievalError::invalid(format!(
                "document {index} has an empty metadata key"
            )));
        }
    }
    Ok(())
}

/// Each field is length-prefixed so no content can mimic a metadata pair.
fn seed_id(item: &NewDocument) -> String {
    let mut name = Vec::new();
    push_field(&mut name, &item.content);
    for (key, value) in &item.metadata {
        push_field(&mut name, key);
        push_field(&mut name, value);
    }
    Uuid::new_v5(&SEED_NAMESPACE, &name).to_string()
}

fn push_field(name: &mut Vec<u8>, field: &str) {
    name.extend_from_slice(&(field.len() as u64).to_be_bytes());
    name.extend_from_slice(field.as_bytes());
}
