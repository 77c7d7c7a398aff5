//! In-process topic bus on `tokio::sync::broadcast`

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::filters::TopicMatcher;
use super::types::Envelope;
use super::{EventBus, EventBusError};

/// Stream of envelopes matching a subscription's topic patterns
pub type EnvelopeStream = Pin<Box<dyn Stream<Item = Envelope> + Send>>;

/// Event bus delivering every published event to all in-process subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastEventBus {
    sender: broadcast::Sender<Envelope>,
}

impl BroadcastEventBus {
    /// Create a bus buffering at most `capacity` events per slow subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to the topics matched by `patterns`.
    pub fn subscribe(&self, patterns: impl Into<TopicMatcher>) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            matcher: patterns.into(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl EventBus for BroadcastEventBus {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<(), EventBusError> {
        match self.sender.send(Envelope::new(topic, payload)) {
            Ok(receivers) => debug!(topic, receivers, "Broadcast event"),
            // Nobody is listening; the event goes unobserved.
            Err(_) => debug!(topic, "Broadcast event with no subscribers"),
        }
        Ok(())
    }
}

/// A filtered view of the bus.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<Envelope>,
    matcher: TopicMatcher,
}

impl Subscription {
    /// Wait for the next matching envelope; `None` once the bus is dropped.
    pub async fn recv(&mut self) -> Option<Envelope> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) if self.matcher.matches(&envelope.topic) => return Some(envelope),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Subscriber lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Topic patterns this subscription matches.
    pub fn matcher(&self) -> &TopicMatcher {
        &self.matcher
    }

    /// Turn the subscription into a stream of matching envelopes.
    pub fn into_stream(self) -> EnvelopeStream {
        let stream = futures::stream::unfold(self, |mut subscription| async move {
            subscription
                .recv()
                .await
                .map(|envelope| (envelope, subscription))
        });
        Box::pin(stream)
    }
}
