//! Configuration builder.
//!
//! This module provides a builder pattern API for creating configurations.

use super::{Result, models::*, validation};
use std::path::Path;

/// Builder for creating TrustlinkConfig instances.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: TrustlinkConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder with default values.
    pub fn new() -> Self {
        Self {
            config: TrustlinkConfig::default(),
        }
    }

    /// Verify HS256 tokens with the given shared secret.
    pub fn with_jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.identity.jwt_secret = secret.into();
        self
    }

    /// Verify RS256 tokens with the PEM public key at `path`.
    pub fn with_public_key<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.identity.public_key_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Require the `iss` claim to match.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.config.identity.issuer = Some(issuer.into());
        self
    }

    /// Require the `aud` claim to match.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.config.identity.audience = Some(audience.into());
        self
    }

    /// Use the in-process document store.
    pub fn with_memory_storage(mut self) -> Self {
        self.config.storage.backend = StorageBackend::Memory;
        self
    }

    /// Publish events on the in-process broadcast bus.
    pub fn with_broadcast_events(mut self, capacity: usize) -> Self {
        self.config.events.transport = EventTransport::Broadcast;
        self.config.events.capacity = capacity;
        self
    }

    /// Deliver events to the given webhook endpoints.
    pub fn with_webhook_events(mut self, endpoints: Vec<String>, token: Option<String>) -> Self {
        self.config.events.transport = EventTransport::Webhook;
        self.config.events.webhook.endpoints = endpoints;
        self.config.events.webhook.token = token;
        self
    }

    /// Drop all events.
    pub fn without_events(mut self) -> Self {
        self.config.events.transport = EventTransport::Disabled;
        self
    }

    /// Set whether accept/reject must come from the stored recipient.
    pub fn with_enforce_recipient(mut self, enforce: bool) -> Self {
        self.config.connections.enforce_recipient = enforce;
        self
    }

    /// Set the feed page size limits.
    pub fn with_feed_limits(mut self, default_limit: usize, max_limit: usize) -> Self {
        self.config.feed.default_limit = default_limit;
        self.config.feed.max_limit = max_limit;
        self
    }

    /// Enable or disable the notification consumer.
    pub fn with_notifications(mut self, enabled: bool) -> Self {
        self.config.notifications.enabled = enabled;
        self
    }

    /// Set the log level.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Set the log format.
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.config.logging.format = format;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<TrustlinkConfig> {
        validation::validate_config(&self.config)?;

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
