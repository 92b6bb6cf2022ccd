use quarry_core::MetadataFilter;
use serde_json::{json, Value};

use crate::mapper::METADATA_PAYLOAD_KEY;
use crate::QdrantStoreError;

/// Translates a metadata filter into a Qdrant payload filter.
///
/// Metadata lives in a nested payload object, so every condition addresses
/// `metadata.<key>`. `Eq` becomes a keyword `match.value` and `In` a
/// `match.any`. `All` and `Any` nest as `must` and `should` clauses.
pub fn to_qdrant_filter(filter: &MetadataFilter) -> Result<Value, QdrantStoreError> {
    filter.validate()?;
    Ok(match filter {
        MetadataFilter::Eq(..) | MetadataFilter::In(..) => json!({ "must": [condition(filter)?] }),
        MetadataFilter::All(filters) => json!({ "must": conditions(filters)? }),
        MetadataFilter::Any(filters) => json!({ "should": conditions(filters)? }),
    })
}

fn conditions(filters: &[MetadataFilter]) -> Result<Vec<Value>, QdrantStoreError> {
    filters.iter().map(condition).collect()
}

fn condition(filter: &MetadataFilter) -> Result<Value, QdrantStoreError> {
    Ok(match filter {
        MetadataFilter::Eq(key, value) => {
            json!({ "key": payload_path(key)?, "match": { "value": value } })
        }
        MetadataFilter::In(key, values) => {
            json!({ "key": payload_path(key)?, "match": { "any": values } })
        }
        MetadataFilter::All(filters) => json!({ "must": conditions(filters)? }),
        MetadataFilter::Any(filters) => json!({ "should": conditions(filters)? }),
    })
}

/// Qdrant reads `.` and `[` as path syntax, so keys carrying anything beyond
/// plain identifier characters are quoted.
pub fn payload_path(key: &str) -> Result<String, QdrantStoreError> {
    if key.contains('"') {
        return Err(QdrantStoreError::UnsupportedFilterKey(key.to_string()));
    }
    let plain = key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if plain {
        Ok(format!("{METADATA_PAYLOAD_KEY}.{key}"))
    } else {
        Ok(format!("{METADATA_PAYLOAD_KEY}.\"{key}\""))
    }
}
