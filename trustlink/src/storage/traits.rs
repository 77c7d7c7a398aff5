//! Trait definitions for document storage

use async_trait::async_trait;
use std::fmt::Debug;

use crate::storage::errors::StorageResult;
use crate::storage::models::{FieldUpdates, Precondition, Query, VersionedDocument};

/// Keyed JSON document storage grouped into collections.
///
/// Every single-key operation is atomic with respect to other operations on
/// the same key. There are no multi-key transactions; callers needing
/// read-modify-write semantics use the version returned by [`get`](Self::get)
/// as a [`Precondition`] on [`update`](Self::update).
#[async_trait]
pub trait DocumentStore: Send + Sync + Debug + 'static {
    /// Check if the store is healthy and available
    async fn health_check(&self) -> StorageResult<bool>;

    /// Get a document by its ID
    async fn get(&self, collection: &str, id: &str) -> StorageResult<Option<VersionedDocument>>;

    /// Insert a document, failing with `AlreadyExists` if the key is taken
    async fn create(
        &self,
        collection: &str,
        id: &str,
        data: serde_json::Value,
    ) -> StorageResult<VersionedDocument>;

    /// Insert or replace a document unconditionally
    async fn set(
        &self,
        collection: &str,
        id: &str,
        data: serde_json::Value,
    ) -> StorageResult<VersionedDocument>;

    /// Merge top-level fields into an existing document.
    ///
    /// Fails with `NotFound` if the key is absent and with `VersionConflict`
    /// if the precondition no longer holds.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        updates: FieldUpdates,
        precondition: Precondition,
    ) -> StorageResult<VersionedDocument>;

    /// Run a conjunctive equality query over a collection
    async fn query(&self, collection: &str, query: Query) -> StorageResult<Vec<VersionedDocument>>;
}
