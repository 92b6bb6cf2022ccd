use std::time::Duration;

use quarry_core::{EmbeddingError, FilterError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("embedding failed: {0}")]
    EmbeddingFailure(#[source] EmbeddingError),
    #[error("index write failed: {source}")]
    IndexWriteFailure {
        /// Ids that the index reported as durably written before failing.
        committed: Vec<String>,
        #[source]
        source: StoreError,
    },
    #[error("index query failed: {0}")]
    IndexQueryFailure(#[source] StoreError),
    #[error("operation was cancelled")]
    Cancelled,
    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

/// Coarse classification used by transports to pick a status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    EmbeddingFailure,
    IndexWriteFailure,
    IndexQueryFailure,
    Cancelled,
    DeadlineExceeded,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::EmbeddingFailure => "embedding_failure",
            ErrorKind::IndexWriteFailure => "index_write_failure",
            ErrorKind::IndexQueryFailure => "index_query_failure",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

impl RetrievalError {
    pub fn invalid(message: impl Into<String>) -> Self {
        RetrievalError::InvalidArgument(message.into())
    }

    pub fn index_write(source: StoreError) -> Self {
        let committed = source.committed_ids().to_vec();
        RetrievalError::IndexWriteFailure { committed, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RetrievalError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            RetrievalError::EmbeddingFailure(_) => ErrorKind::EmbeddingFailure,
            RetrievalError::IndexWriteFailure { .. } => ErrorKind::IndexWriteFailure,
            RetrievalError::IndexQueryFailure(_) => ErrorKind::IndexQueryFailure,
            RetrievalError::Cancelled => ErrorKind::Cancelled,
            RetrievalError::DeadlineExceeded(_) => ErrorKind::DeadlineExceeded,
        }
    }

    /// Invalid input is the caller's fault; everything else may succeed later.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            RetrievalError::InvalidArgument(_) | RetrievalError::Cancelled
        )
    }
}

impl From<EmbeddingError> for RetrievalError {
    fn from(error: EmbeddingError) -> Self {
        RetrievalError::EmbeddingFailure(error)
    }
}

impl From<FilterError> for RetrievalError {
    fn from(error: FilterError) -> Self {
        RetrievalError::InvalidArgument(error.to_string())
    }
}

pub type RetrievalResult<T> = Result<T, RetrievalError>;
