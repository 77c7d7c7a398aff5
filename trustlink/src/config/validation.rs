//! Configuration validation utilities.

use super::ConfigError;
use super::models::*;

/// Validate the entire configuration.
pub fn validate_config(config: &TrustlinkConfig) -> Result<(), ConfigError> {
    validate_identity_config(&config.identity)?;
    validate_storage_config(&config.storage)?;
    validate_events_config(&config.events)?;
    validate_feed_config(&config.feed)?;

    if config.notifications.enabled && config.notifications.topics.is_empty() {
        return Err(ConfigError::ValidationError(
            "Notification consumer needs at least one topic".to_string(),
        ));
    }

    Ok(())
}

fn validate_identity_config(config: &IdentityConfig) -> Result<(), ConfigError> {
    if config.jwt_secret.is_empty() && config.public_key_path.is_none() {
        return Err(ConfigError::ValidationError(
            "Either identity.jwt_secret or identity.public_key_path must be set".to_string(),
        ));
    }

    if let Some(path) = &config.public_key_path
        && !path.exists()
    {
        return Err(ConfigError::ValidationError(format!(
            "Public key file not found: {}",
            path.display()
        )));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    let collections = [
        &config.relationships_collection,
        &config.users_collection,
        &config.posts_collection,
    ];

    if collections.iter().any(|name| name.is_empty()) {
        return Err(ConfigError::ValidationError(
            "Collection names cannot be empty".to_string(),
        ));
    }

    for (i, name) in collections.iter().enumerate() {
        if collections[i + 1..].contains(name) {
            return Err(ConfigError::ValidationError(format!(
                "Collection '{}' is configured twice",
                name
            )));
        }
    }

    Ok(())
}

fn validate_events_config(config: &EventsConfig) -> Result<(), ConfigError> {
    match config.transport {
        EventTransport::Broadcast => {
            if config.capacity == 0 {
                return Err(ConfigError::ValidationError(
                    "Broadcast capacity must be greater than 0".to_string(),
                ));
            }
        }
        EventTransport::Webhook => {
            if config.webhook.endpoints.is_empty() {
                return Err(ConfigError::ValidationError(
                    "Webhook transport needs at least one endpoint".to_string(),
                ));
            }
            if let Some(endpoint) = config
                .webhook
                .endpoints
                .iter()
                .find(|e| !(e.starts_with("http://") || e.starts_with("https://")))
            {
                return Err(ConfigError::ValidationError(format!(
                    "Webhook endpoint must be an http(s) URL: {}",
                    endpoint
                )));
            }
        }
        EventTransport::Disabled => {}
    }

    Ok(())
}

fn validate_feed_config(config: &FeedConfig) -> Result<(), ConfigError> {
    if config.default_limit == 0 {
        return Err(ConfigError::ValidationError(
            "feed.default_limit must be greater than 0".to_string(),
        ));
    }
    if config.default_limit > config.max_limit {
        return Err(ConfigError::ValidationError(format!(
            "feed.default_limit ({}) exceeds feed.max_limit ({})",
            config.default_limit, config.max_limit
        )));
    }
    Ok(())
}
