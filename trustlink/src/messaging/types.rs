//! Event payloads and the envelope they travel in

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload of `connection.requested` and `connection.accepted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEvent {
    pub from_uid: String,
    pub to_uid: String,
    pub created_at: DateTime<Utc>,
}

/// Payload of `post.created`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCreatedEvent {
    pub post_id: String,
    pub author_uid: String,
    pub created_at: DateTime<Utc>,
}

/// An event payload classified by its fields.
///
/// Consumers receive raw JSON and tell the kinds apart by field presence:
/// `postId` marks a post event, `fromUid` a connection event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    PostCreated(PostCreatedEvent),
    Connection(ConnectionEvent),
}

impl DomainEvent {
    /// Classify raw bytes. `Ok(None)` means well-formed JSON of an unknown kind.
    pub fn from_slice(body: &[u8]) -> Result<Option<Self>, serde_json::Error> {
        let value: Value = serde_json::from_slice(body)?;
        Self::from_value(value)
    }

    /// Classify an already parsed payload.
    pub fn from_value(value: Value) -> Result<Option<Self>, serde_json::Error> {
        if value.get("postId").is_some() {
            return serde_json::from_value(value).map(|e| Some(DomainEvent::PostCreated(e)));
        }
        if value.get("fromUid").is_some() {
            return serde_json::from_value(value).map(|e| Some(DomainEvent::Connection(e)));
        }
        Ok(None)
    }
}

/// Wire form of an event delivered over the webhook transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub topic: String,
    pub payload: Value,
    pub published_at: DateTime<Utc>,
}

impl Envelope {
    pub fn new(topic: impl Into<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
            published_at: Utc::now(),
        }
    }
}
