use std::fmt;
use std::time::Duration;

use crate::{QdrantStoreError, QdrantVectorStore};

pub const DEFAULT_UPSERT_BATCH_SIZE: usize = 256;

#[derive(Default, Clone)]
pub struct QdrantStoreBuilder {
    base_url: Option<String>,
    collection: Option<String>,
    api_key: Option<String>,
    dimension: Option<usize>,
    upsert_batch_size: Option<usize>,
    timeout: Option<Duration>,
}

impl fmt::Debug for QdrantStoreBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_key = if self.api_key.is_some() {
            "<redacted>"
        } else {
            "<none>"
        };

        f.debug_struct("QdrantStoreBuilder")
            .field("base_url", &self.base_url)
            .field("collection", &self.collection)
            .field("api_key", &api_key)
            .field("dimension", &self.dimension)
            .field("upsert_batch_size", &self.upsert_batch_size)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl QdrantStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, value: impl Into<String>) -> Self {
        self.base_url = Some(value.into());
        self
    }

    pub fn collection(mut self, value: impl Into<String>) -> Self {
        self.collection = Some(value.into());
        self
    }

    pub fn api_key(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.api_key = if value.trim().is_empty() {
            None
        } else {
            Some(value)
        };
        self
    }

    /// Vector size the collection holds. When set, writes and queries of
    /// any other size are rejected before a request is made.
    pub fn dimension(mut self, value: usize) -> Self {
        self.dimension = Some(value);
        self
    }

    /// Points sent per upsert request.
    pub fn upsert_batch_size(mut self, value: usize) -> Self {
        self.upsert_batch_size = Some(value);
        self
    }

    pub fn timeout(mut self, value: Duration) -> Self {
        self.timeout = Some(value);
        self
    }

    pub fn build(self) -> Result<QdrantVectorStore, QdrantStoreError> {
        let base_url = self.base_url.ok_or(QdrantStoreError::MissingBaseUrl)?;
        if base_url.trim().is_empty() {
            return Err(QdrantStoreError::EmptyBaseUrl);
        }

        let collection = self.collection.ok_or(QdrantStoreError::MissingCollection)?;
        if collection.trim().is_empty() {
            return Err(QdrantStoreError::EmptyCollection);
        }

        let upsert_batch_size = self.upsert_batch_size.unwrap_or(DEFAULT_UPSERT_BATCH_SIZE);
        if upsert_batch_size == 0 {
            return Err(QdrantStoreError::InvalidBatchSize);
        }

        if looks_like_qdrant_cloud(&base_url) && self.api_key.is_none() {
            tracing::warn!(
                base_url = %base_url,
                "qdrant cloud URL detected without an API key; requests may fail"
            );
        }

        let mut client = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            client = client.timeout(timeout);
        }

        Ok(QdrantVectorStore {
            client: client.build()?,
            base_url,
            collection,
            api_key: self.api_key,
            dimension: self.dimension,
            upsert_batch_size,
            timeout: self.timeout,
        })
    }
}

fn looks_like_qdrant_cloud(base_url: &str) -> bool {
    const CLOUD_DOMAIN: &[u8] = b"cloud.qdrant.io";

    base_url
        .as_bytes()
        .windows(CLOUD_DOMAIN.len())
        .any(|window| window.eq_ignore_ascii_case(CLOUD_DOMAIN))
}
