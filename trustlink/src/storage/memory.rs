//! In-memory document store backed by `DashMap`
//!
//! Suitable for single-process deployments and tests. Each collection is its
//! own concurrent map, and every write goes through the map's entry lock so
//! single-key operations are linearizable.

use async_trait::async_trait;
use chrono::DateTime;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

use crate::storage::errors::{StorageError, StorageResult};
use crate::storage::models::{Direction, FieldUpdates, Precondition, Query, VersionedDocument};
use crate::storage::traits::DocumentStore;

type Collection = DashMap<String, StoredDocument>;

#[derive(Debug, Clone)]
struct StoredDocument {
    version: u64,
    data: Value,
}

impl StoredDocument {
    fn to_versioned(&self, id: &str) -> VersionedDocument {
        VersionedDocument {
            id: id.to_string(),
            version: self.version,
            data: self.data.clone(),
        }
    }
}

/// Concurrent in-memory implementation of [`DocumentStore`].
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: DashMap<String, Arc<Collection>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collection(&self, name: &str) -> Arc<Collection> {
        self.collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(DashMap::new()))
            .value()
            .clone()
    }

    /// Number of documents currently held in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|c| c.len())
            .unwrap_or(0)
    }
}

fn ensure_object(data: &Value) -> StorageResult<()> {
    if data.is_object() {
        Ok(())
    } else {
        Err(StorageError::Serialization(
            "Documents must be JSON objects".to_string(),
        ))
    }
}

/// Order two JSON values of the same kind; missing values sort first.
///
/// Strings that both parse as RFC 3339 timestamps compare as instants, since
/// their textual form varies in fractional digits.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::String(a)), Some(Value::String(b))) => {
            match (
                DateTime::parse_from_rfc3339(a),
                DateTime::parse_from_rfc3339(b),
            ) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => a.cmp(b),
            }
        }
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn health_check(&self) -> StorageResult<bool> {
        Ok(true)
    }

    async fn get(&self, collection: &str, id: &str) -> StorageResult<Option<VersionedDocument>> {
        let Some(docs) = self.collections.get(collection).map(|c| c.value().clone()) else {
            return Ok(None);
        };
        Ok(docs.get(id).map(|doc| doc.to_versioned(id)))
    }

    async fn create(
        &self,
        collection: &str,
        id: &str,
        data: Value,
    ) -> StorageResult<VersionedDocument> {
        ensure_object(&data)?;
        let docs = self.collection(collection);

        match docs.entry(id.to_string()) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists(format!(
                "{}/{}",
                collection, id
            ))),
            Entry::Vacant(vacant) => {
                let stored = vacant.insert(StoredDocument { version: 1, data });
                debug!(collection, id, "Created document");
                Ok(stored.to_versioned(id))
            }
        }
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> StorageResult<VersionedDocument> {
        ensure_object(&data)?;
        let docs = self.collection(collection);

        let mut entry = docs
            .entry(id.to_string())
            .or_insert(StoredDocument { version: 0, data: Value::Null });
        entry.version += 1;
        entry.data = data;
        Ok(entry.to_versioned(id))
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        updates: FieldUpdates,
        precondition: Precondition,
    ) -> StorageResult<VersionedDocument> {
        let docs = self.collection(collection);
        let Some(mut doc) = docs.get_mut(id) else {
            return Err(StorageError::NotFound(format!("{}/{}", collection, id)));
        };

        if let Precondition::Version(expected) = precondition
            && doc.version != expected
        {
            return Err(StorageError::VersionConflict {
                key: format!("{}/{}", collection, id),
                expected,
                actual: doc.version,
            });
        }

        let Some(fields) = doc.data.as_object_mut() else {
            return Err(StorageError::Backend(format!(
                "Stored document {}/{} is not an object",
                collection, id
            )));
        };
        fields.extend(updates);
        doc.version += 1;

        debug!(collection, id, version = doc.version, "Updated document");
        Ok(doc.to_versioned(id))
    }

    async fn query(&self, collection: &str, query: Query) -> StorageResult<Vec<VersionedDocument>> {
        let Some(docs) = self.collections.get(collection).map(|c| c.value().clone()) else {
            return Ok(Vec::new());
        };

        let mut results: Vec<VersionedDocument> = docs
            .iter()
            .filter(|entry| query.matches(&entry.value().data))
            .map(|entry| entry.value().to_versioned(entry.key()))
            .collect();

        match &query.order_by {
            Some((field, direction)) => results.sort_by(|a, b| {
                let ordering = compare_values(a.data.get(field), b.data.get(field))
                    .then_with(|| a.id.cmp(&b.id));
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            }),
            None => results.sort_by(|a, b| a.id.cmp(&b.id)),
        }

        if let Some(limit) = query.limit {
            results.truncate(limit);
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> FieldUpdates {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_create_is_insert_if_absent() {
        let store = MemoryDocumentStore::new();

        let doc = store.create("users", "u1", json!({"name": "A"})).await.unwrap();
        assert_eq!(doc.version, 1);

        let err = store
            .create("users", "u1", json!({"name": "B"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));

        let stored = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(stored.data["name"], "A");
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = MemoryDocumentStore::new();
        assert!(store.get("users", "nobody").await.unwrap().is_none());
        store.create("users", "u1", json!({})).await.unwrap();
        assert!(store.get("users", "nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_non_object_documents() {
        let store = MemoryDocumentStore::new();
        let err = store.create("users", "u1", json!("scalar")).await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_set_bumps_version() {
        let store = MemoryDocumentStore::new();
        let first = store.set("users", "u1", json!({"n": 1})).await.unwrap();
        let second = store.set("users", "u1", json!({"n": 2})).await.unwrap();

        assert_eq!(first.version, 1);
        assert_eq!(second.version, 2);
        assert_eq!(second.data, json!({"n": 2}));
    }

    #[tokio::test]
    async fn test_update_merges_top_level_fields() {
        let store = MemoryDocumentStore::new();
        store
            .create("users", "u1", json!({"name": "A", "bio": "old"}))
            .await
            .unwrap();

        let updated = store
            .update("users", "u1", object(json!({"bio": "new"})), Precondition::None)
            .await
            .unwrap();

        assert_eq!(updated.version, 2);
        assert_eq!(updated.data, json!({"name": "A", "bio": "new"}));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryDocumentStore::new();
        let err = store
            .update("users", "ghost", FieldUpdates::new(), Precondition::None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_with_stale_version_conflicts() {
        let store = MemoryDocumentStore::new();
        let doc = store.create("rel", "a_b", json!({"status": "requested"})).await.unwrap();

        store
            .update(
                "rel",
                "a_b",
                object(json!({"status": "accepted"})),
                Precondition::Version(doc.version),
            )
            .await
            .unwrap();

        let err = store
            .update(
                "rel",
                "a_b",
                object(json!({"status": "rejected"})),
                Precondition::Version(doc.version),
            )
            .await
            .unwrap_err();

        match err {
            StorageError::VersionConflict { expected, actual, .. } => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let stored = store.get("rel", "a_b").await.unwrap().unwrap();
        assert_eq!(stored.data["status"], "accepted");
    }

    #[tokio::test]
    async fn test_query_filters_orders_and_limits() {
        let store = MemoryDocumentStore::new();
        for (id, author, created) in [
            ("p1", "alice", "2024-01-01T00:00:00Z"),
            ("p2", "bob", "2024-01-02T00:00:00Z"),
            ("p3", "alice", "2024-01-03T00:00:00Z"),
            ("p4", "alice", "2024-01-04T00:00:00Z"),
        ] {
            store
                .create("posts", id, json!({"author": author, "createdAt": created}))
                .await
                .unwrap();
        }

        let results = store
            .query(
                "posts",
                Query::new()
                    .where_eq("author", "alice")
                    .order_by("createdAt", Direction::Descending)
                    .limit(2),
            )
            .await
            .unwrap();

        let ids: Vec<_> = results.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["p4", "p3"]);
    }

    #[tokio::test]
    async fn test_query_unknown_collection_is_empty() {
        let store = MemoryDocumentStore::new();
        let results = store.query("nothing", Query::new()).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_creates_have_single_winner() {
        let store = Arc::new(MemoryDocumentStore::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create("rel", "a_b", json!({"writer": i})).await.is_ok()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(store.len("rel"), 1);
    }

    #[test]
    fn test_compare_values() {
        assert_eq!(
            compare_values(Some(&json!(1)), Some(&json!(2.5))),
            Ordering::Less
        );
        assert_eq!(compare_values(None, Some(&json!("a"))), Ordering::Less);
        assert_eq!(
            compare_values(Some(&json!("b")), Some(&json!("a"))),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(
                Some(&json!("2024-01-01T10:00:00Z")),
                Some(&json!("2024-01-01T10:00:00.500Z"))
            ),
            Ordering::Less
        );
    }
}
