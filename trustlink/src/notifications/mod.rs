//! Notification consumer
//!
//! Turns domain events into per-user [`Notification`]s and hands them to a
//! [`NotificationSink`]. Events arrive either from an in-process
//! [`Subscription`] or as webhook envelopes from other processes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::connections::RelationshipStore;
use crate::messaging::{ConnectionEvent, DomainEvent, Envelope, PostCreatedEvent, Subscription, topics};
use crate::{Result, TrustlinkError};

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewPost,
    ConnectionRequested,
    ConnectionAccepted,
}

/// A message addressed to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub recipient_uid: String,
    pub kind: NotificationKind,
    /// The user whose action caused the notification
    pub actor_uid: String,
    /// Post id for post notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Delivers notifications to users.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Sink that only logs each notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        info!(
            recipient_uid = %notification.recipient_uid,
            actor_uid = %notification.actor_uid,
            kind = ?notification.kind,
            "Notification"
        );
        Ok(())
    }
}

/// Routes events to handlers and fans notifications out to the sink.
#[derive(Clone)]
pub struct NotificationDispatcher {
    connections: RelationshipStore,
    sink: Arc<dyn NotificationSink>,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("connections", &self.connections)
            .finish_non_exhaustive()
    }
}

impl NotificationDispatcher {
    pub fn new(connections: RelationshipStore, sink: Arc<dyn NotificationSink>) -> Self {
        Self { connections, sink }
    }

    /// Handle a raw event body. Returns the number of notifications delivered.
    pub async fn handle(&self, topic: &str, body: &[u8]) -> Result<usize> {
        let value: Value = serde_json::from_slice(body).map_err(|e| {
            error!(topic, error = %e, "Failed to parse event");
            TrustlinkError::InvalidArgument(format!("Malformed event: {}", e))
        })?;
        self.handle_value(topic, value).await
    }

    /// Handle an envelope received over the webhook transport.
    pub async fn handle_envelope(&self, envelope: Envelope) -> Result<usize> {
        self.handle_value(&envelope.topic, envelope.payload).await
    }

    /// Handle a parsed event payload, classifying it by its fields.
    pub async fn handle_value(&self, topic: &str, payload: Value) -> Result<usize> {
        let event = DomainEvent::from_value(payload).map_err(|e| {
            error!(topic, error = %e, "Failed to parse event");
            TrustlinkError::InvalidArgument(format!("Malformed event: {}", e))
        })?;

        match event {
            Some(DomainEvent::PostCreated(event)) => self.handle_post_created(event).await,
            Some(DomainEvent::Connection(event)) => self.handle_connection(topic, event).await,
            None => {
                warn!(topic, "Unknown event type");
                Ok(0)
            }
        }
    }

    async fn handle_post_created(&self, event: PostCreatedEvent) -> Result<usize> {
        info!(post_id = %event.post_id, author_uid = %event.author_uid, "Handling post.created event");

        let recipients = self
            .connections
            .accepted_counterparts(&event.author_uid)
            .await?;

        let notifications = recipients.into_iter().map(|recipient_uid| Notification {
            recipient_uid,
            kind: NotificationKind::NewPost,
            actor_uid: event.author_uid.clone(),
            subject_id: Some(event.post_id.clone()),
            created_at: event.created_at,
        });

        let mut delivered = 0;
        for notification in notifications {
            delivered += self.deliver(&notification).await;
        }
        Ok(delivered)
    }

    async fn handle_connection(&self, topic: &str, event: ConnectionEvent) -> Result<usize> {
        info!(topic, from_uid = %event.from_uid, to_uid = %event.to_uid, "Handling connection event");

        let (recipient_uid, actor_uid, kind) = match topic {
            topics::CONNECTION_REQUESTED => (
                event.to_uid,
                event.from_uid,
                NotificationKind::ConnectionRequested,
            ),
            topics::CONNECTION_ACCEPTED => (
                event.from_uid,
                event.to_uid,
                NotificationKind::ConnectionAccepted,
            ),
            _ => {
                warn!(topic, "Connection event on unexpected topic");
                return Ok(0);
            }
        };

        let notification = Notification {
            recipient_uid,
            kind,
            actor_uid,
            subject_id: None,
            created_at: event.created_at,
        };
        Ok(self.deliver(&notification).await)
    }

    async fn deliver(&self, notification: &Notification) -> usize {
        match self.sink.deliver(notification).await {
            Ok(()) => 1,
            Err(e) => {
                warn!(
                    recipient_uid = %notification.recipient_uid,
                    error = %e,
                    "Failed to deliver notification"
                );
                0
            }
        }
    }

    /// Consume a subscription until it closes or `shutdown` resolves.
    pub async fn run<F>(self, mut subscription: Subscription, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        info!(topics = ?subscription.matcher().patterns(), "Notification consumer started");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Notification consumer shutting down");
                    break;
                }
                envelope = subscription.recv() => {
                    let Some(envelope) = envelope else {
                        debug!("Event bus closed");
                        break;
                    };
                    if let Err(e) = self.handle_envelope(envelope).await {
                        error!(error = %e, "Failed to handle event");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionsConfig;
    use crate::messaging::{BroadcastEventBus, EventBus, NoopEventBus};
    use crate::storage::MemoryDocumentStore;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<Notification>>,
        fail_for: Option<String>,
    }

    impl RecordingSink {
        fn delivered(&self) -> Vec<Notification> {
            self.delivered.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn deliver(&self, notification: &Notification) -> Result<()> {
            if self.fail_for.as_deref() == Some(notification.recipient_uid.as_str()) {
                return Err(TrustlinkError::Unavailable("push gateway down".to_string()));
            }
            self.delivered.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    fn connections() -> RelationshipStore {
        RelationshipStore::new(
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(NoopEventBus),
            ConnectionsConfig::default(),
        )
    }

    fn dispatcher(sink: Arc<RecordingSink>) -> (NotificationDispatcher, RelationshipStore) {
        let connections = connections();
        (
            NotificationDispatcher::new(connections.clone(), sink),
            connections,
        )
    }

    #[tokio::test]
    async fn test_post_created_fans_out_to_accepted_connections() {
        let sink = Arc::new(RecordingSink::default());
        let (dispatcher, connections) = dispatcher(sink.clone());

        connections.request("alice", "bob").await.unwrap();
        connections.accept("bob", "alice").await.unwrap();
        connections.request("carol", "alice").await.unwrap();
        connections.accept("alice", "carol").await.unwrap();
        connections.request("alice", "dave").await.unwrap();

        let body = br#"{"postId":"p1","authorUid":"alice","createdAt":"2024-05-01T10:00:00Z"}"#;
        let delivered = dispatcher.handle(topics::POST_CREATED, body).await.unwrap();

        assert_eq!(delivered, 2);
        let mut recipients: Vec<_> = sink
            .delivered()
            .into_iter()
            .map(|n| {
                assert_eq!(n.kind, NotificationKind::NewPost);
                assert_eq!(n.actor_uid, "alice");
                assert_eq!(n.subject_id.as_deref(), Some("p1"));
                n.recipient_uid
            })
            .collect();
        recipients.sort();
        assert_eq!(recipients, vec!["bob", "carol"]);
    }

    #[tokio::test]
    async fn test_connection_requested_notifies_recipient() {
        let sink = Arc::new(RecordingSink::default());
        let (dispatcher, _) = dispatcher(sink.clone());

        let body = br#"{"fromUid":"alice","toUid":"bob","createdAt":"2024-05-01T10:00:00Z"}"#;
        assert_eq!(
            dispatcher.handle(topics::CONNECTION_REQUESTED, body).await.unwrap(),
            1
        );

        let delivered = sink.delivered();
        assert_eq!(delivered[0].recipient_uid, "bob");
        assert_eq!(delivered[0].actor_uid, "alice");
        assert_eq!(delivered[0].kind, NotificationKind::ConnectionRequested);
    }

    #[tokio::test]
    async fn test_connection_accepted_notifies_initiator() {
        let sink = Arc::new(RecordingSink::default());
        let (dispatcher, _) = dispatcher(sink.clone());

        let payload = json!({"fromUid": "alice", "toUid": "bob", "createdAt": "2024-05-01T10:00:00Z"});
        dispatcher
            .handle_value(topics::CONNECTION_ACCEPTED, payload)
            .await
            .unwrap();

        let delivered = sink.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].recipient_uid, "alice");
        assert_eq!(delivered[0].kind, NotificationKind::ConnectionAccepted);
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_events() {
        let sink = Arc::new(RecordingSink::default());
        let (dispatcher, _) = dispatcher(sink.clone());

        assert_eq!(
            dispatcher.handle("post.created", br#"{"hello":"world"}"#).await.unwrap(),
            0
        );
        assert!(matches!(
            dispatcher.handle("post.created", b"{not json").await.unwrap_err(),
            TrustlinkError::InvalidArgument(_)
        ));
        assert!(dispatcher
            .handle("post.created", br#"{"postId":"p1"}"#)
            .await
            .is_err());
        assert!(sink.delivered().is_empty());
    }

    #[tokio::test]
    async fn test_sink_failure_skips_one_recipient() {
        let sink = Arc::new(RecordingSink {
            fail_for: Some("bob".to_string()),
            ..RecordingSink::default()
        });
        let (dispatcher, connections) = dispatcher(sink.clone());

        for friend in ["bob", "carol"] {
            connections.request("alice", friend).await.unwrap();
            connections.accept(friend, "alice").await.unwrap();
        }

        let body = br#"{"postId":"p1","authorUid":"alice","createdAt":"2024-05-01T10:00:00Z"}"#;
        assert_eq!(dispatcher.handle(topics::POST_CREATED, body).await.unwrap(), 1);
        assert_eq!(sink.delivered()[0].recipient_uid, "carol");
    }

    #[tokio::test]
    async fn test_run_consumes_subscription_until_shutdown() {
        let sink = Arc::new(RecordingSink::default());
        let (dispatcher, _) = dispatcher(sink.clone());
        let bus = BroadcastEventBus::new(16);
        let subscription = bus.subscribe(vec!["connection.*"]);
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let consumer = tokio::spawn(dispatcher.run(subscription, async move {
            let _ = stop_rx.await;
        }));

        bus.publish(
            topics::CONNECTION_REQUESTED,
            json!({"fromUid": "alice", "toUid": "bob", "createdAt": "2024-05-01T10:00:00Z"}),
        )
        .await
        .unwrap();
        bus.publish(topics::POST_CREATED, json!({"postId": "p9"}))
            .await
            .unwrap();

        for _ in 0..50 {
            if !sink.delivered().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        stop_tx.send(()).unwrap();
        consumer.await.unwrap();

        let delivered = sink.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].recipient_uid, "bob");
    }
}
