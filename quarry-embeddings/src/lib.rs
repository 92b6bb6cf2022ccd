//! Remote embedding providers implementing [`quarry_core::Embedding`].
//!
//! Each provider sits behind a cargo feature so a deployment only pulls in
//! the HTTP stack it talks to.

mod error;

#[cfg(any(feature = "openai", feature = "ollama"))]
mod response;

#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "ollama")]
mod ollama;

pub use error::EmbeddingProviderError;

#[cfg(feature = "openai")]
pub use openai::OpenAiEmbedding;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaEmbedding, DEFAULT_OLLAMA_URL};
