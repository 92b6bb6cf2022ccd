//! Core data model and collaborator traits for Quarry.
//!
//! The two seams are [`Embedding`] (text to vectors) and [`VectorStore`]
//! (nearest-neighbour storage). Everything above them is written against
//! these traits so providers and indexes can be swapped at the composition
//! root.

mod document;
mod embedding;
mod error;
mod metadata_filter;
mod vector_store;

pub use document::{Document, DocumentView, Metadata, NewDocument};
pub use embedding::Embedding;
pub use error::{EmbeddingError, StoreError};
pub use metadata_filter::{FilterError, MetadataFilter};
pub use vector_store::{SearchResult, VectorStore};
