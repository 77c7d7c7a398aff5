use crate::config::{LogFormat, LogLevel, LoggingConfig};
use crate::logging::{build_filter, create_non_blocking_file, format_for_env, level_filter};
use tracing::level_filters::LevelFilter;

#[test]
fn test_init_console_logging() {
    let config = LoggingConfig {
        level: LogLevel::Debug,
        format: LogFormat::Compact,
        directives: None,
        file: None,
        stdout: true,
    };

    // Either installs the subscriber or finds one already installed
    assert!(crate::logging::init(&config).is_ok());
    assert!(crate::logging::init(&config).unwrap().is_none());
}

#[test]
fn test_file_writer_creates_parent_directories() {
    let temp_dir = tempfile::tempdir().unwrap();
    let log_path = temp_dir.path().join("nested").join("trustlink.log");

    let (_writer, _guard) = create_non_blocking_file(&log_path).unwrap();

    assert!(log_path.parent().unwrap().exists());
}

#[test]
fn test_filter_directives() {
    let config = LoggingConfig {
        directives: Some("hyper=warn, tower_http=debug".to_string()),
        ..LoggingConfig::default()
    };
    let filter = build_filter(&config).unwrap();
    let rendered = filter.to_string();
    if std::env::var("RUST_LOG").is_err() {
        assert!(rendered.contains("hyper=warn"));
        assert!(rendered.contains("tower_http=debug"));
    }
}

#[test]
fn test_invalid_directive_is_rejected() {
    if std::env::var("RUST_LOG").is_ok() {
        return;
    }
    let config = LoggingConfig {
        directives: Some("hyper=loud".to_string()),
        ..LoggingConfig::default()
    };
    assert!(build_filter(&config).is_err());
}

#[test]
fn test_level_conversion() {
    assert_eq!(level_filter(&LogLevel::Trace), LevelFilter::TRACE);
    assert_eq!(level_filter(&LogLevel::Info), LevelFilter::INFO);
    assert_eq!(level_filter(&LogLevel::Error), LevelFilter::ERROR);
}

#[test]
fn test_format_for_env() {
    assert_eq!(format_for_env("prod"), LogFormat::Json);
    assert_eq!(format_for_env("PROD"), LogFormat::Json);
    assert_eq!(format_for_env("dev"), LogFormat::Pretty);
}
