use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Metadata;

/// Predicate over string metadata.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum MetadataFilter {
    /// Key present and value equal.
    Eq(String, String),
    /// Key present and value equal to one of the listed values.
    In(String, Vec<String>),
    All(Vec<MetadataFilter>),
    Any(Vec<MetadataFilter>),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("metadata filter key must not be empty")]
    EmptyKey,
    #[error("in(...) filter on '{0}' requires at least one value")]
    EmptyIn(String),
    #[error("{0}(...) filter requires at least one clause")]
    EmptyGroup(&'static str),
}

impl MetadataFilter {
    pub fn eq(key: impl Into<String>, value: impl Into<String>) -> Self {
        MetadataFilter::Eq(key.into(), value.into())
    }

    /// Rejects filters that can never be satisfied by any stored document.
    pub fn validate(&self) -> Result<(), FilterError> {
        match self {
            MetadataFilter::Eq(key, _) => check_key(key),
            MetadataFilter::In(key, values) => {
                check_key(key)?;
                if values.is_empty() {
                    return Err(FilterError::EmptyIn(key.clone()));
                }
                Ok(())
            }
            MetadataFilter::All(filters) => check_group("all", filters),
            MetadataFilter::Any(filters) => check_group("any", filters),
        }
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            MetadataFilter::Eq(key, value) => metadata.get(key) == Some(value),
            MetadataFilter::In(key, values) => metadata
                .get(key)
                .map_or(false, |entry| values.iter().any(|value| value == entry)),
            MetadataFilter::All(filters) => filters.iter().all(|filter| filter.matches(metadata)),
            MetadataFilter::Any(filters) => filters.iter().any(|filter| filter.matches(metadata)),
        }
    }
}

fn check_key(key: &str) -> Result<(), FilterError> {
    if key.trim().is_empty() {
        Err(FilterError::EmptyKey)
    } else {
        Ok(())
    }
}

fn check_group(name: &'static str, filters: &[MetadataFilter]) -> Result<(), FilterError> {
    if filters.is_empty() {
        return Err(FilterError::EmptyGroup(name));
    }
    filters.iter().try_for_each(MetadataFilter::validate)
}
