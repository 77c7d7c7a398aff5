//! Storage abstractions and implementations
//!
//! Services persist their records as JSON documents in named collections
//! through the [`DocumentStore`] trait. The only bundled backend is
//! [`MemoryDocumentStore`]; other backends implement the same trait.

pub mod errors;
pub mod memory;
pub mod models;
pub mod traits;

pub use errors::{StorageError, StorageResult};
pub use memory::MemoryDocumentStore;
pub use models::{Direction, FieldUpdates, Precondition, Query, VersionedDocument, encode};
pub use traits::DocumentStore;

use crate::config::{StorageBackend, StorageConfig};
use std::sync::Arc;

/// Create the document store selected by the configuration.
pub fn create_store(config: &StorageConfig) -> Arc<dyn DocumentStore> {
    match config.backend {
        StorageBackend::Memory => Arc::new(MemoryDocumentStore::new()),
    }
}
