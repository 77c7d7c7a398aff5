//! Document and query types shared by all document store backends

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::{StorageError, StorageResult};

/// A stored document together with its key and version.
///
/// `version` starts at 1 on creation and increases by one on every write to
/// the same key, so it can be used as a compare-and-swap token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedDocument {
    pub id: String,
    pub version: u64,
    pub data: Value,
}

impl VersionedDocument {
    /// Deserialize the document body into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> StorageResult<T> {
        serde_json::from_value(self.data.clone()).map_err(|e| {
            StorageError::Serialization(format!("Document '{}' is malformed: {}", self.id, e))
        })
    }
}

/// Serialize a typed record into a JSON object suitable for storage.
pub fn encode<T: Serialize>(record: &T) -> StorageResult<Value> {
    let value = serde_json::to_value(record)?;
    if !value.is_object() {
        return Err(StorageError::Serialization(
            "Documents must serialize to a JSON object".to_string(),
        ));
    }
    Ok(value)
}

/// Top-level field updates applied by [`DocumentStore::update`](super::DocumentStore::update).
pub type FieldUpdates = Map<String, Value>;

/// Conditional write precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precondition {
    /// Write regardless of the current version
    #[default]
    None,

    /// Write only if the stored version still equals this value
    Version(u64),
}

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// A conjunctive equality query over one collection.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// `field == value` filters, all of which must hold
    pub filters: Vec<(String, Value)>,

    /// Optional ordering on a top-level field
    pub order_by: Option<(String, Direction)>,

    /// Maximum number of documents returned
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality filter.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    /// Order results by a field.
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    /// Limit the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check whether a document body satisfies every filter.
    pub fn matches(&self, data: &Value) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| data.get(field) == Some(expected))
    }
}
