//! # Trustlink
//!
//! Core library for the Trustlink social graph services: user profiles, a
//! post feed, and the connection (relationship) workflow between identities.
//!
//! Every service is built from three injected collaborators:
//!
//! - an [`identity::IdentityProvider`] that turns a bearer credential into a
//!   stable subject identifier,
//! - a [`storage::DocumentStore`] holding keyed JSON documents,
//! - an [`messaging::EventBus`] receiving domain events after durable writes.
//!
//! ```rust
//! use std::sync::Arc;
//! use trustlink::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
//! let bus: Arc<dyn EventBus> = Arc::new(NoopEventBus);
//! let connections = RelationshipStore::new(store, bus, ConnectionsConfig::default());
//!
//! connections.request("alice", "bob").await?;
//! let accepted = connections.accept("bob", "alice").await?;
//! assert_eq!(accepted.status, RelationshipStatus::Accepted);
//! # Ok::<(), TrustlinkError>(())
//! # }).unwrap();
//! ```

pub mod config;
pub mod connections;
pub mod feed;
pub mod identity;
pub mod logging;
pub mod messaging;
pub mod notifications;
pub mod profiles;
pub mod storage;

/// The prelude re-exports commonly used types for convenience
pub mod prelude {
    pub use crate::config::{
        ConfigBuilder, ConfigLoader, ConnectionsConfig, EventTransport, LogFormat, LogLevel,
        TrustlinkConfig,
    };
    pub use crate::connections::{Relationship, RelationshipStatus, RelationshipStore, relationship_id};
    pub use crate::feed::{FeedService, NewPost, Post};
    pub use crate::identity::{Identity, IdentityProvider, JwtIdentityProvider};
    pub use crate::messaging::{BroadcastEventBus, EventBus, NoopEventBus, WebhookEventBus, topics};
    pub use crate::notifications::{Notification, NotificationDispatcher, NotificationSink};
    pub use crate::profiles::{Profile, ProfileService, ProfileUpdate};
    pub use crate::storage::{DocumentStore, MemoryDocumentStore, StorageError};
    pub use crate::{Result, TrustlinkError};
}

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error type for Trustlink operations
#[derive(Debug, thiserror::Error)]
pub enum TrustlinkError {
    /// Missing or self-referential arguments
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Missing or invalid credential
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// The acting identity may not perform the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The addressed record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The record is in a state that does not allow the operation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A backing service could not be reached
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Unexpected failure in a backing service
    #[error("Internal error: {0}")]
    Internal(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Logging could not be initialized
    #[error("Logging error: {0}")]
    Logging(#[from] logging::LogError),
}

/// Result type for Trustlink operations
pub type Result<T> = std::result::Result<T, TrustlinkError>;

impl From<config::ConfigError> for TrustlinkError {
    fn from(err: config::ConfigError) -> Self {
        TrustlinkError::Configuration(err.to_string())
    }
}

impl From<identity::AuthError> for TrustlinkError {
    fn from(err: identity::AuthError) -> Self {
        TrustlinkError::Unauthenticated(err.to_string())
    }
}
