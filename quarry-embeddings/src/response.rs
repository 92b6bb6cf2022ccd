use crate::EmbeddingProviderError;

/// Checks a provider reply has one vector per input, each of `dimension`.
pub(crate) fn check_embeddings(
    expected: usize,
    dimension: usize,
    vectors: Vec<Vec<f32>>,
) -> Result<Vec<Vec<f32>>, EmbeddingProviderError> {
    if vectors.len() != expected {
        return Err(EmbeddingProviderError::InvalidResponse(format!(
            "expected {} embeddings, got {}",
            expected,
            vectors.len()
        )));
    }
    if let Some(bad) = vectors.iter().find(|vector| vector.len() != dimension) {
        return Err(EmbeddingProviderError::InvalidResponse(format!(
            "expected embedding dimension {}, got {}",
            dimension,
            bad.len()
        )));
    }
    Ok(vectors)
}
