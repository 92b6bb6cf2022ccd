use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::CreateEmbeddingRequestArgs;
use async_openai::Client;
use async_trait::async_trait;
use quarry_core::{Embedding, EmbeddingError};

use crate::response::check_embeddings;
use crate::EmbeddingProviderError;

/// Embeddings from the OpenAI `/embeddings` endpoint or a compatible server.
#[derive(Clone)]
pub struct OpenAiEmbedding {
    client: Client<OpenAIConfig>,
    model: String,
    dimension: usize,
    request_dimensions: bool,
}

impl OpenAiEmbedding {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, dimension: usize) -> Self {
        Self::with_config(
            OpenAIConfig::new().with_api_key(api_key),
            model,
            dimension,
        )
    }

    pub fn with_config(config: OpenAIConfig, model: impl Into<String>, dimension: usize) -> Self {
        Self::with_client(Client::with_config(config), model, dimension)
    }

    pub fn with_client(
        client: Client<OpenAIConfig>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            dimension,
            request_dimensions: false,
        }
    }

    /// Sends `dimensions` with each request so models that support
    /// shortening return vectors of the configured size.
    pub fn request_dimensions(mut self, enabled: bool) -> Self {
        self.request_dimensions = enabled;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn create(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let expected = inputs.len();
        let mut args = CreateEmbeddingRequestArgs::default();
        args.model(&self.model).input(inputs);
        if self.request_dimensions {
            let dimensions = u32::try_from(self.dimension).map_err(|_| {
                EmbeddingProviderError::InvalidInput(format!(
                    "dimension {} does not fit the request",
                    self.dimension
                ))
            })?;
            args.dimensions(dimensions);
        }
        let request = args
            .build()
            .map_err(|err| EmbeddingError::Other(Box::new(err)))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        let mut data = response.data;
        data.sort_by_key(|item| item.index);
        let vectors = data.into_iter().map(|item| item.embedding).collect();
        Ok(check_embeddings(expected, self.dimension, vectors)?)
    }
}

fn map_openai_error(error: OpenAIError) -> EmbeddingProviderError {
    match error {
        OpenAIError::ApiError(api) => {
            tracing::debug!(kind = ?api.r#type, "openai api error");
            match api.r#type.as_deref() {
                Some("invalid_request_error") => EmbeddingProviderError::InvalidInput(api.message),
                Some("requests") | Some("tokens") | Some("insufficient_quota") => {
                    EmbeddingProviderError::RateLimited { retry_after: None }
                }
                _ => EmbeddingProviderError::Request(api.message),
            }
        }
        OpenAIError::JSONDeserialize(err) => EmbeddingProviderError::InvalidResponse(err.to_string()),
        OpenAIError::InvalidArgument(message) => EmbeddingProviderError::InvalidInput(message),
        other => EmbeddingProviderError::Request(other.to_string()),
    }
}

#[async_trait]
impl Embedding for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.create(vec![text.to_string()]).await?;
        vectors.pop().ok_or_else(|| {
            EmbeddingProviderError::InvalidResponse("missing embedding".to_string()).into()
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.create(texts.to_vec()).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
