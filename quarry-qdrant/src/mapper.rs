use quarry_core::{Document, DocumentView, Metadata, SearchResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::QdrantStoreError;

/// Payload key holding the document text.
pub const CONTENT_PAYLOAD_KEY: &str = "content";
/// Payload key holding the metadata object. Filters address `metadata.<key>`.
pub const METADATA_PAYLOAD_KEY: &str = "metadata";
/// Payload key holding the insertion sequence used to order equal scores.
pub const SEQUENCE_PAYLOAD_KEY: &str = "sequence";

#[derive(Debug, Clone, Serialize)]
pub struct UpsertPointsRequest {
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchPointsRequest {
    pub vector: Vec<f32>,
    pub limit: usize,
    pub with_payload: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<JsonValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountPointsRequest {
    pub exact: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateCollectionRequest {
    pub vectors: VectorParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorParams {
    pub size: usize,
    pub distance: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub result: T,
}

#[derive(Debug, Deserialize)]
pub struct CountResult {
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct CollectionInfo {
    pub config: CollectionConfig,
}

#[derive(Debug, Deserialize)]
pub struct CollectionConfig {
    pub params: CollectionParams,
}

#[derive(Debug, Deserialize)]
pub struct CollectionParams {
    pub vectors: VectorParams,
}

#[derive(Debug, Deserialize)]
pub struct ScoredPoint {
    pub id: PointId,
    pub score: f32,
    #[serde(default)]
    pub payload: JsonMap<String, JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    String(String),
    Number(u64),
}

impl PointId {
    pub fn from_document_id(id: String) -> Result<Self, QdrantStoreError> {
        if id.trim().is_empty() {
            return Err(QdrantStoreError::InvalidDocumentId(id));
        }

        Ok(PointId::String(id))
    }

    pub fn as_string(&self) -> String {
        match self {
            PointId::String(value) => value.clone(),
            PointId::Number(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Point {
    pub id: PointId,
    pub vector: Vec<f32>,
    pub payload: JsonMap<String, JsonValue>,
}

pub fn doc_to_point(doc: Document) -> Result<Point, QdrantStoreError> {
    let id = PointId::from_document_id(doc.id)?;

    let metadata: JsonMap<String, JsonValue> = doc
        .metadata
        .into_iter()
        .map(|(key, value)| (key, JsonValue::String(value)))
        .collect();

    let mut payload = JsonMap::new();
    payload.insert(
        CONTENT_PAYLOAD_KEY.to_string(),
        JsonValue::String(doc.content),
    );
    payload.insert(
        METADATA_PAYLOAD_KEY.to_string(),
        JsonValue::Object(metadata),
    );
    payload.insert(
        SEQUENCE_PAYLOAD_KEY.to_string(),
        JsonValue::from(doc.sequence),
    );

    Ok(Point {
        id,
        vector: doc.embedding,
        payload,
    })
}

pub fn scored_point_to_result(point: ScoredPoint) -> Result<SearchResult, QdrantStoreError> {
    let point_id = point.id.as_string();
    let mut payload = point.payload;

    let content = match payload.remove(CONTENT_PAYLOAD_KEY) {
        Some(JsonValue::String(text)) => text,
        Some(other) => {
            return Err(QdrantStoreError::InvalidContentPayloadType {
                point_id,
                expected: "string",
                actual: value_type_name(&other),
            });
        }
        None => return Err(QdrantStoreError::MissingContentPayload { point_id }),
    };

    let mut metadata = Metadata::new();
    match payload.remove(METADATA_PAYLOAD_KEY) {
        Some(JsonValue::Object(entries)) => {
            for (key, value) in entries {
                match value {
                    JsonValue::String(text) => {
                        metadata.insert(key, text);
                    }
                    other => {
                        return Err(QdrantStoreError::InvalidMetadataPayload {
                            point_id,
                            key,
                            actual: value_type_name(&other),
                        });
                    }
                }
            }
        }
        Some(other) => {
            return Err(QdrantStoreError::InvalidMetadataPayload {
                point_id,
                key: METADATA_PAYLOAD_KEY.to_string(),
                actual: value_type_name(&other),
            });
        }
        None => {}
    }

    // Points written without a sequence sort ahead of stamped ones.
    let sequence = match payload.remove(SEQUENCE_PAYLOAD_KEY) {
        Some(value) => value
            .as_u64()
            .ok_or_else(|| QdrantStoreError::InvalidSequencePayload {
                point_id: point_id.clone(),
                actual: value_type_name(&value),
            })?,
        None => 0,
    };

    Ok(SearchResult {
        document: DocumentView {
            id: point_id,
            content,
            metadata,
            sequence,
        },
        score: point.score,
    })
}

fn value_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
