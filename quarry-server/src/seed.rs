use quarry_core::NewDocument;
use quarry_retrieval::RetrievalResult;

use crate::AppState;

/// Documents loaded at startup unless seeding is skipped.
pub fn seed_documents() -> Vec<NewDocument> {
    vec![
        NewDocument::new(
            "Spring Framework is a comprehensive framework for enterprise Java development.",
        )
        .with_metadata("category", "framework")
        .with_metadata("technology", "java"),
        NewDocument::new("Oracle AI Database introduces AI-powered vector search capabilities.")
            .with_metadata("category", "database")
            .with_metadata("technology", "oracle"),
        NewDocument::new("Vector embeddings represent text as high-dimensional numerical vectors.")
            .with_metadata("category", "concept")
            .with_metadata("technology", "ai"),
        NewDocument::new(
            "Machine learning models can understand semantic similarity using embeddings.",
        )
        .with_metadata("category", "concept")
        .with_metadata("technology", "ml"),
    ]
}

pub async fn seed(state: &AppState) -> RetrievalResult<Vec<String>> {
    state.documents.seed(seed_documents()).await
}
