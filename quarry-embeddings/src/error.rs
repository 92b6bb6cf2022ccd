use std::time::Duration;

use quarry_core::EmbeddingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingProviderError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("input rejected: {0}")]
    InvalidInput(String),
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl From<EmbeddingProviderError> for EmbeddingError {
    fn from(error: EmbeddingProviderError) -> Self {
        match error {
            EmbeddingProviderError::InvalidResponse(message) => {
                EmbeddingError::InvalidResponse(message)
            }
            EmbeddingProviderError::Request(message) => EmbeddingError::Provider(message),
            EmbeddingProviderError::InvalidInput(message) => EmbeddingError::InvalidInput(message),
            EmbeddingProviderError::RateLimited { retry_after } => {
                EmbeddingError::RateLimited { retry_after }
            }
            EmbeddingProviderError::Timeout(after) => EmbeddingError::Timeout(after),
        }
    }
}
