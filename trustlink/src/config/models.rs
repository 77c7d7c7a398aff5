//! Configuration model definitions.
//!
//! This module contains the configuration structures for all Trustlink components.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::messaging::topics;

/// Main configuration structure for Trustlink.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TrustlinkConfig {
    /// Bearer token verification
    pub identity: IdentityConfig,

    /// Document store configuration
    pub storage: StorageConfig,

    /// Event bus configuration
    pub events: EventsConfig,

    /// Connection workflow policy
    pub connections: ConnectionsConfig,

    /// Feed listing limits
    pub feed: FeedConfig,

    /// Notification consumer configuration
    pub notifications: NotificationsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Configuration for verifying externally issued ID tokens.
///
/// Tokens are verified with HS256 against `jwt_secret`, or with RS256 against
/// the PEM public key at `public_key_path` when that is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Shared secret for HS256 tokens
    pub jwt_secret: String,

    /// PEM encoded RSA public key for RS256 tokens
    pub public_key_path: Option<PathBuf>,

    /// Expected `iss` claim
    pub issuer: Option<String>,

    /// Expected `aud` claim
    pub audience: Option<String>,

    /// Clock skew tolerated when checking `exp`
    #[serde(with = "humantime_serde")]
    pub leeway: Duration,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            public_key_path: None,
            issuer: None,
            audience: None,
            leeway: Duration::from_secs(60),
        }
    }
}

/// Configuration for the document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend holding the documents
    pub backend: StorageBackend,

    /// Collection holding relationship documents
    pub relationships_collection: String,

    /// Collection holding user profiles
    pub users_collection: String,

    /// Collection holding posts
    pub posts_collection: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            relationships_collection: "relationships".to_string(),
            users_collection: "users".to_string(),
            posts_collection: "posts".to_string(),
        }
    }
}

/// Document store backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process document store
    Memory,
}

/// Configuration for the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// How events leave the publishing service
    pub transport: EventTransport,

    /// Buffer size of the in-process broadcast channel
    pub capacity: usize,

    /// Webhook transport settings
    pub webhook: WebhookConfig,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            transport: EventTransport::Broadcast,
            capacity: 1024,
            webhook: WebhookConfig::default(),
        }
    }
}

/// Event transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventTransport {
    /// In-process topic bus
    Broadcast,

    /// HTTP POST of every event to the configured endpoints
    Webhook,

    /// Events are dropped
    Disabled,
}

/// Webhook transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Endpoints receiving event envelopes
    pub endpoints: Vec<String>,

    /// Bearer token sent with, and required on, webhook deliveries
    pub token: Option<String>,

    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            token: None,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Policy for the connection workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionsConfig {
    /// Require the acting identity to be the stored recipient on accept/reject.
    ///
    /// When false the record addressed by `(fromUid, actingUid)` is updated
    /// without checking which side of the pair initiated it.
    pub enforce_recipient: bool,
}

impl Default for ConnectionsConfig {
    fn default() -> Self {
        Self {
            enforce_recipient: true,
        }
    }
}

/// Limits for listing posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Page size used when the caller gives none or an out of range value
    pub default_limit: usize,

    /// Largest page size a caller may ask for
    pub max_limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

/// Notification consumer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Whether the consumer runs in this process
    pub enabled: bool,

    /// Name the consumer logs under
    pub queue: String,

    /// Topic patterns the consumer subscribes to
    pub topics: Vec<String>,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            queue: "notification-service".to_string(),
            topics: vec![
                topics::POST_CREATED.to_string(),
                topics::CONNECTION_REQUESTED.to_string(),
                topics::CONNECTION_ACCEPTED.to_string(),
            ],
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,

    /// Log format
    pub format: LogFormat,

    /// Extra filter directives, e.g. `"hyper=warn,tower_http=debug"`
    pub directives: Option<String>,

    /// File to log to (if any)
    pub file: Option<PathBuf>,

    /// Whether to log to stdout
    pub stdout: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
            directives: None,
            file: None,
            stdout: true,
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level
    Trace,

    /// Debug level
    Debug,

    /// Info level
    Info,

    /// Warn level
    Warn,

    /// Error level
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format, one object per line
    Json,

    /// Compact format
    Compact,

    /// Pretty format
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}
