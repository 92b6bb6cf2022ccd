use std::borrow::Cow;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use quarry_core::EmbeddingError;
use quarry_retrieval::RetrievalError;
use serde::Serialize;

/// A failure rendered as a JSON error response.
#[derive(Debug)]
pub enum ApiError {
    Retrieval(RetrievalError),
    /// An extractor refused the request before it reached the core.
    Rejected { status: StatusCode, message: String },
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::Retrieval(RetrievalError::invalid(message))
    }

    /// Keeps the extractor's own status: 400 for malformed input, 413 for an
    /// oversized body, 415 for a missing content type.
    pub fn rejected(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
            return ApiError::invalid(message);
        }
        ApiError::Rejected { status, message }
    }

    pub fn status(&self) -> StatusCode {
        let error = match self {
            ApiError::Retrieval(error) => error,
            ApiError::Rejected { status, .. } => return *status,
        };
        match error {
            RetrievalError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            RetrievalError::EmbeddingFailure(EmbeddingError::RateLimited { .. }) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            RetrievalError::EmbeddingFailure(_) => StatusCode::BAD_GATEWAY,
            RetrievalError::IndexWriteFailure { .. }
            | RetrievalError::IndexQueryFailure(_)
            | RetrievalError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            RetrievalError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    fn kind(&self) -> Cow<'static, str> {
        match self {
            ApiError::Retrieval(error) => Cow::Borrowed(error.kind().as_str()),
            ApiError::Rejected { status, .. } => Cow::Owned(
                status
                    .canonical_reason()
                    .unwrap_or("rejected")
                    .to_ascii_lowercase()
                    .replace(' ', "_"),
            ),
        }
    }
}

impl From<RetrievalError> for ApiError {
    fn from(error: RetrievalError) -> Self {
        ApiError::Retrieval(error)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: Cow<'static, str>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    committed: Option<&'a [String]>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let (message, committed, retry_after) = match &self {
            ApiError::Retrieval(error) => {
                if status.is_server_error() {
                    tracing::warn!(kind = %kind, %error, "request failed");
                }
                let committed = match error {
                    RetrievalError::IndexWriteFailure { committed, .. } if !committed.is_empty() => {
                        Some(committed.as_slice())
                    }
                    _ => None,
                };
                let retry_after = match error {
                    RetrievalError::EmbeddingFailure(error) => error.retry_after(),
                    _ => None,
                };
                (error.to_string(), committed, retry_after)
            }
            ApiError::Rejected { message, .. } => (message.clone(), None, None),
        };

        let body = ErrorBody {
            error: kind,
            message,
            committed,
        };
        let mut response = (status, Json(body)).into_response();

        if let Some(retry_after) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().max(1).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
