use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Scalar string metadata attached to a document.
///
/// Keys are unique and iteration order is sorted, so serialized output is
/// stable across runs.
pub type Metadata = BTreeMap<String, String>;

/// A caller-supplied document that has not been embedded or assigned an id yet.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewDocument {
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl NewDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl<C, I, K, V> From<(C, I)> for NewDocument
where
    C: Into<String>,
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    fn from((content, metadata): (C, I)) -> Self {
        Self {
            content: content.into(),
            metadata: metadata
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// An embedded document as handed to a vector index.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
    /// Insertion stamp. Lower values were inserted earlier and win score ties.
    #[serde(default)]
    pub sequence: u64,
}

impl Document {
    pub fn view(&self) -> DocumentView {
        DocumentView {
            id: self.id.clone(),
            content: self.content.clone(),
            metadata: self.metadata.clone(),
            sequence: self.sequence,
        }
    }

    pub fn into_view(self) -> DocumentView {
        DocumentView {
            id: self.id,
            content: self.content,
            metadata: self.metadata,
            sequence: self.sequence,
        }
    }
}

/// Read-only view of a stored document. The embedding is never exposed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentView {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    #[serde(default)]
    pub sequence: u64,
}
