//! Webhook transport delivering event envelopes over HTTP
//!
//! Every published event is wrapped in an [`Envelope`] and POSTed to each
//! configured endpoint. A configured token is sent as a bearer credential
//! and checked by the receiving side. Delivery is attempted once per
//! endpoint; there is no retry.
//!
//! [`EventBus::publish`] hands the delivery to a background task and returns
//! immediately, so a slow endpoint never holds up the write that produced
//! the event. Failures are logged by that task.

use async_trait::async_trait;
use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, warn};

use super::types::Envelope;
use super::{EventBus, EventBusError};
use crate::config::WebhookConfig;

/// Event bus that POSTs every event to remote endpoints.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use trustlink::messaging::WebhookEventBus;
///
/// let bus = WebhookEventBus::new(
///     vec!["http://notifications:8080/internal/events".to_string()],
///     Some("secret".to_string()),
///     Duration::from_secs(5),
/// )
/// .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct WebhookEventBus {
    endpoints: Vec<String>,
    token: Option<String>,
    client: reqwest::Client,
}

impl WebhookEventBus {
    /// Create a webhook bus for the given endpoints
    pub fn new(
        endpoints: Vec<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, EventBusError> {
        if endpoints.is_empty() {
            return Err(EventBusError::Configuration(
                "Webhook transport needs at least one endpoint".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EventBusError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoints,
            token,
            client,
        })
    }

    /// Create a webhook bus from configuration
    pub fn from_config(config: &WebhookConfig) -> Result<Self, EventBusError> {
        Self::new(config.endpoints.clone(), config.token.clone(), config.timeout)
    }

    /// Configured endpoints
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// POST an envelope to every endpoint concurrently and wait for all of them.
    ///
    /// Returns the first failure, if any.
    pub async fn deliver(&self, envelope: &Envelope) -> Result<(), EventBusError> {
        let results = join_all(
            self.endpoints
                .iter()
                .map(|endpoint| self.send(endpoint, envelope)),
        )
        .await;

        let mut first_error = None;
        for (endpoint, result) in self.endpoints.iter().zip(results) {
            match result {
                Ok(()) => debug!(topic = %envelope.topic, endpoint = %endpoint, "Delivered webhook event"),
                Err(e) => {
                    warn!(topic = %envelope.topic, endpoint = %endpoint, error = %e, "Webhook delivery failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn send(&self, endpoint: &str, envelope: &Envelope) -> Result<(), EventBusError> {
        let mut request = self
            .client
            .post(endpoint)
            .json(envelope)
            .header("X-Webhook-Event", &envelope.topic)
            .header("User-Agent", format!("Trustlink-Webhook/{}", crate::VERSION));

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EventBusError::Transport(format!("{}: {}", endpoint, e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(EventBusError::Rejected {
                endpoint: endpoint.to_string(),
                status: response.status().as_u16(),
            })
        }
    }
}

#[async_trait]
impl EventBus for WebhookEventBus {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<(), EventBusError> {
        let envelope = Envelope::new(topic, payload);
        let bus = self.clone();
        tokio::spawn(async move {
            // Per-endpoint failures are already logged.
            let _ = bus.deliver(&envelope).await;
        });
        Ok(())
    }
}
