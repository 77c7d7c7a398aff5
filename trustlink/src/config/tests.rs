use crate::config::{
    ConfigBuilder, ConfigError, ConfigLoader, EventTransport, LogFormat, LogLevel,
    StorageBackend, TrustlinkConfig, validate_config,
};
use figment::providers::{Format, Toml};
use std::io::Write;
use std::time::Duration;

#[test]
fn test_default_config() {
    let config = TrustlinkConfig::default();
    assert_eq!(config.storage.backend, StorageBackend::Memory);
    assert_eq!(config.storage.relationships_collection, "relationships");
    assert_eq!(config.events.transport, EventTransport::Broadcast);
    assert!(config.connections.enforce_recipient);
    assert_eq!(config.feed.default_limit, 20);
    assert_eq!(config.feed.max_limit, 100);
    assert_eq!(config.notifications.topics.len(), 3);
    assert_eq!(config.logging.level, LogLevel::Info);
}

#[test]
fn test_default_config_requires_identity_key() {
    let result = validate_config(&TrustlinkConfig::default());
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
}

#[test]
fn test_config_builder() {
    let config = ConfigBuilder::new()
        .with_jwt_secret("secret")
        .with_issuer("https://issuer.example")
        .with_enforce_recipient(false)
        .with_feed_limits(10, 50)
        .with_log_level(LogLevel::Debug)
        .with_log_format(LogFormat::Json)
        .build()
        .unwrap();

    assert_eq!(config.identity.jwt_secret, "secret");
    assert_eq!(config.identity.issuer.as_deref(), Some("https://issuer.example"));
    assert!(!config.connections.enforce_recipient);
    assert_eq!(config.feed.default_limit, 10);
    assert_eq!(config.feed.max_limit, 50);
    assert_eq!(config.logging.level, LogLevel::Debug);
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_webhook_transport_needs_endpoint() {
    let result = ConfigBuilder::new()
        .with_jwt_secret("secret")
        .with_webhook_events(vec![], None)
        .build();
    assert!(result.is_err());

    let result = ConfigBuilder::new()
        .with_jwt_secret("secret")
        .with_webhook_events(vec!["ftp://nope".to_string()], None)
        .build();
    assert!(result.is_err());

    let config = ConfigBuilder::new()
        .with_jwt_secret("secret")
        .with_webhook_events(vec!["http://localhost:8084/internal/events".to_string()], None)
        .build()
        .unwrap();
    assert_eq!(config.events.transport, EventTransport::Webhook);
}

#[test]
fn test_feed_limits_validation() {
    assert!(
        ConfigBuilder::new()
            .with_jwt_secret("secret")
            .with_feed_limits(0, 100)
            .build()
            .is_err()
    );
    assert!(
        ConfigBuilder::new()
            .with_jwt_secret("secret")
            .with_feed_limits(200, 100)
            .build()
            .is_err()
    );
}

#[test]
fn test_duplicate_collections_rejected() {
    let mut config = ConfigBuilder::new().with_jwt_secret("secret").build().unwrap();
    config.storage.posts_collection = "users".to_string();
    assert!(validate_config(&config).is_err());
}

#[test]
fn test_loader_merges_toml_source() {
    let mut loader = ConfigLoader::new();
    loader.merge(Toml::string(
        r#"
        [identity]
        jwt_secret = "from-toml"
        leeway = "30s"

        [connections]
        enforce_recipient = false

        [events]
        transport = "disabled"
        "#,
    ));

    let config = loader.extract().unwrap();
    assert_eq!(config.identity.jwt_secret, "from-toml");
    assert_eq!(config.identity.leeway, Duration::from_secs(30));
    assert!(!config.connections.enforce_recipient);
    assert_eq!(config.events.transport, EventTransport::Disabled);
    // Untouched sections keep their defaults
    assert_eq!(config.feed.default_limit, 20);
}

#[test]
fn test_loader_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trustlink.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "[identity]\njwt_secret = \"file-secret\"\n[feed]\nmax_limit = 40").unwrap();

    let mut loader = ConfigLoader::new();
    loader.load_file(&path).unwrap();
    let config = loader.extract().unwrap();

    assert_eq!(config.identity.jwt_secret, "file-secret");
    assert_eq!(config.feed.max_limit, 40);
}

#[test]
fn test_loader_rejects_missing_and_unknown_files() {
    let dir = tempfile::tempdir().unwrap();

    let mut loader = ConfigLoader::new();
    assert!(matches!(
        loader.load_file(dir.path().join("missing.toml")),
        Err(ConfigError::FileLoadError(_))
    ));

    let path = dir.path().join("trustlink.ini");
    std::fs::write(&path, "jwt_secret=x").unwrap();
    assert!(matches!(
        loader.load_file(&path),
        Err(ConfigError::FileLoadError(_))
    ));
}

#[test]
fn test_log_level_parsing() {
    assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warn);
    assert!("verbose".parse::<LogLevel>().is_err());
    assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
    assert_eq!(LogLevel::Trace.to_string(), "trace");
}
