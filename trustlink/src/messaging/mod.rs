//! Domain event publishing
//!
//! Services publish events through the [`EventBus`] trait after a durable
//! write. Publishing is best-effort: a failed publish is logged and never
//! changes the outcome of the operation that produced the event.
//!
//! Transports:
//! - [`BroadcastEventBus`]: in-process topic bus for single-process deployments
//! - [`WebhookEventBus`]: HTTP delivery of event envelopes to other processes
//! - [`NoopEventBus`]: drops every event

pub mod broadcast;
pub mod filters;
pub mod types;
pub mod webhook;

pub use broadcast::{BroadcastEventBus, Subscription};
pub use filters::TopicMatcher;
pub use types::{ConnectionEvent, DomainEvent, Envelope, PostCreatedEvent};
pub use webhook::WebhookEventBus;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

/// Topic names used by the services
pub mod topics {
    /// A new post was written
    pub const POST_CREATED: &str = "post.created";

    /// A connection was requested
    pub const CONNECTION_REQUESTED: &str = "connection.requested";

    /// A connection request was accepted
    pub const CONNECTION_ACCEPTED: &str = "connection.accepted";
}

/// Error type for event publishing
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    /// The event could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The transport failed to deliver the event
    #[error("Transport error: {0}")]
    Transport(String),

    /// The receiving endpoint rejected the event
    #[error("Rejected by {endpoint}: HTTP {status}")]
    Rejected { endpoint: String, status: u16 },

    /// Invalid transport configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Topic-based publish interface.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish one payload on a topic
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<(), EventBusError>;
}

/// Serialize an event and publish it, logging instead of failing.
///
/// Returns whether the publish succeeded so callers can record it.
pub async fn publish_best_effort<E: Serialize>(bus: &dyn EventBus, topic: &str, event: &E) -> bool {
    let payload = match serde_json::to_value(event) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(topic, error = %e, "Failed to serialize event");
            return false;
        }
    };

    match bus.publish(topic, payload).await {
        Ok(()) => {
            debug!(topic, "Published event");
            true
        }
        Err(e) => {
            warn!(topic, error = %e, "Failed to publish event");
            false
        }
    }
}

/// Event bus that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventBus;

#[async_trait]
impl EventBus for NoopEventBus {
    async fn publish(&self, topic: &str, _payload: serde_json::Value) -> Result<(), EventBusError> {
        debug!(topic, "Events disabled, dropping event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_best_effort_reports_success() {
        let mut bus = MockEventBus::new();
        bus.expect_publish()
            .withf(|topic, payload| topic == topics::POST_CREATED && payload["postId"] == "p1")
            .times(1)
            .returning(|_, _| Ok(()));

        let ok = publish_best_effort(&bus, topics::POST_CREATED, &json!({"postId": "p1"})).await;
        assert!(ok);
    }

    #[tokio::test]
    async fn test_publish_best_effort_swallows_failure() {
        let mut bus = MockEventBus::new();
        bus.expect_publish()
            .times(1)
            .returning(|_, _| Err(EventBusError::Transport("broker down".to_string())));

        let ok = publish_best_effort(&bus, topics::CONNECTION_REQUESTED, &json!({})).await;
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_noop_bus_accepts_everything() {
        assert!(NoopEventBus.publish("anything", json!(null)).await.is_ok());
    }
}
