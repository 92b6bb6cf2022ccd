use std::time::Duration;

use quarry_core::EmbeddingError;
use quarry_embeddings::EmbeddingProviderError;

#[test]
fn embedding_provider_error_maps_to_embedding_error() {
    let invalid_response: EmbeddingError =
        EmbeddingProviderError::InvalidResponse("bad payload".to_string()).into();
    assert!(matches!(
        &invalid_response,
        EmbeddingError::InvalidResponse(message) if message == "bad payload"
    ));
    assert_eq!(
        format!("{invalid_response}"),
        "Embedding invalid response: bad payload"
    );

    let request: EmbeddingError =
        EmbeddingProviderError::Request("upstream timeout".to_string()).into();
    assert!(matches!(
        &request,
        EmbeddingError::Provider(message) if message == "upstream timeout"
    ));
    assert_eq!(
        format!("{request}"),
        "Embedding provider error: upstream timeout"
    );
}

#[test]
fn rate_limit_and_timeout_keep_their_durations() {
    let limited: EmbeddingError = EmbeddingProviderError::RateLimited {
        retry_after: Some(Duration::from_secs(2)),
    }
    .into();
    assert_eq!(limited.retry_after(), Some(Duration::from_secs(2)));

    let timeout: EmbeddingError =
        EmbeddingProviderError::Timeout(Duration::from_millis(250)).into();
    assert!(matches!(timeout, EmbeddingError::Timeout(after) if after == Duration::from_millis(250)));

    let rejected: EmbeddingError =
        EmbeddingProviderError::InvalidInput("too long".to_string()).into();
    assert_eq!(format!("{rejected}"), "Embedding rejected input: too long");
}
