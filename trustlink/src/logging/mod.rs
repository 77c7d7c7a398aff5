//! Structured logging infrastructure for Trustlink.
//!
//! Installs a global `tracing` subscriber from a [`LoggingConfig`], with
//! pretty, compact or JSON output to stdout and/or a non-blocking file writer.

#[cfg(test)]
mod tests;

use crate::config::{LogFormat, LogLevel, LoggingConfig};
use std::path::Path;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Error type for logging operations
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing log level or filter directives
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    /// Error in subscriber setup
    #[error("Subscriber error: {0}")]
    SubscriberError(Box<dyn std::error::Error + Send + Sync>),
}

/// Result type for logging operations
pub type Result<T> = std::result::Result<T, LogError>;

/// Initialize the logging system with the given configuration.
///
/// When a log file is configured the returned guard flushes the file writer
/// on drop; keep it alive for the lifetime of the process. If a global
/// subscriber is already installed this is a no-op.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    if tracing::dispatcher::has_been_set() {
        return Ok(None);
    }

    let filter = build_filter(config)?;

    let (file_writer, guard) = match &config.file {
        Some(path) => {
            let (writer, guard) = create_non_blocking_file(path)?;
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    match (file_writer, config.stdout) {
        (Some(writer), true) => install(&config.format, filter, std::io::stdout.and(writer))?,
        (Some(writer), false) => install(&config.format, filter, writer)?,
        (None, true) => install(&config.format, filter, std::io::stdout)?,
        (None, false) => install(&config.format, filter, std::io::sink)?,
    }

    Ok(guard)
}

/// Build the event filter: `RUST_LOG` wins when set, otherwise the configured
/// level plus any extra directives.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut filter = EnvFilter::builder()
        .with_default_directive(level_filter(&config.level).into())
        .parse("")
        .map_err(|e| LogError::InvalidFilter(e.to_string()))?;

    if let Some(directives) = &config.directives {
        for directive in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            let directive = directive
                .parse()
                .map_err(|e| LogError::InvalidFilter(format!("{}: {}", directive, e)))?;
            filter = filter.add_directive(directive);
        }
    }

    Ok(filter)
}

fn install<W>(format: &LogFormat, filter: EnvFilter, writer: W) -> Result<()>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true)
        .with_line_number(true);

    match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    }
    .map_err(LogError::SubscriberError)
}

/// Create a non-blocking file writer.
fn create_non_blocking_file(path: impl AsRef<Path>) -> Result<(NonBlocking, WorkerGuard)> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| LogError::InvalidFilter(format!("Not a file path: {}", path.display())))?;

    let file_appender = tracing_appender::rolling::never(
        path.parent().unwrap_or_else(|| Path::new(".")),
        file_name,
    );

    Ok(tracing_appender::non_blocking(file_appender))
}

/// Convert a LogLevel to the matching tracing level filter.
pub fn level_filter(level: &LogLevel) -> LevelFilter {
    match level {
        LogLevel::Trace => LevelFilter::TRACE,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Error => LevelFilter::ERROR,
    }
}

/// Pick the output format for a deployment environment name.
///
/// `prod` logs JSON; everything else logs pretty, human-oriented output.
pub fn format_for_env(env: &str) -> LogFormat {
    if env.eq_ignore_ascii_case("prod") {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    }
}
