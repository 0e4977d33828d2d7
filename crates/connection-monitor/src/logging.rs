//! Tracing subscriber setup for pathwatch binaries.
//!
//! The `[logging]` section of a configuration file maps onto
//! [`LoggingConfig`]. Each monitor task runs inside a `monitor` span carrying
//! its connection label, so `span_events` controls whether monitor lifetimes
//! show up in the output.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{Error, Result};

/// Output format of log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    /// One JSON object per line
    Json,
}

/// Which span lifecycle events are logged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanEvents {
    #[default]
    None,
    /// Span creation and close, e.g. a monitor starting and ending
    Lifecycle,
    /// Every entry into and exit from a span
    Active,
}

impl SpanEvents {
    fn fmt_span(self) -> FmtSpan {
        match self {
            SpanEvents::None => FmtSpan::NONE,
            SpanEvents::Lifecycle => FmtSpan::NEW | FmtSpan::CLOSE,
            SpanEvents::Active => FmtSpan::ACTIVE,
        }
    }
}

/// Logging section of the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level; `RUST_LOG` directives take precedence
    pub level: String,
    pub format: LogFormat,
    pub span_events: SpanEvents,
    /// Include source file and line
    pub file_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Full,
            span_events: SpanEvents::None,
            file_info: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_span_events(mut self, span_events: SpanEvents) -> Self {
        self.span_events = span_events;
        self
    }

    /// The parsed default level
    pub fn level(&self) -> Result<Level> {
        parse_log_level(&self.level)
    }

    pub fn validate(&self) -> Result<()> {
        self.level().map(|_| ())
    }
}

/// Install the global subscriber described by `config`.
///
/// Fails if the level is invalid or a global subscriber is already installed.
pub fn setup_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(config.level()?).into())
        .from_env_lossy();

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_span_events(config.span_events.fmt_span())
        .with_file(config.file_info)
        .with_line_number(config.file_info);

    let installed = match config.format {
        LogFormat::Full => builder.try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|e| Error::Logging(e.to_string()))
}

/// Parse a log level name, case-insensitively
pub fn parse_log_level(level: &str) -> Result<Level> {
    Level::from_str(level).map_err(|_| Error::Config(format!("Invalid log level: {}", level)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("trace").unwrap(), Level::TRACE);
        assert_eq!(parse_log_level("WARN").unwrap(), Level::WARN);
        assert!(matches!(parse_log_level("chatty"), Err(Error::Config(_))));
    }

    #[test]
    fn test_span_events_mapping() {
        assert_eq!(SpanEvents::None.fmt_span(), FmtSpan::NONE);
        assert_eq!(SpanEvents::Lifecycle.fmt_span(), FmtSpan::NEW | FmtSpan::CLOSE);
        assert_eq!(SpanEvents::Active.fmt_span(), FmtSpan::ACTIVE);
    }

    #[test]
    fn test_parse_section() {
        let config: LoggingConfig = toml::from_str(
            r#"
            level = "debug"
            format = "json"
            span_events = "lifecycle"
            "#,
        )
        .unwrap();
        assert_eq!(config.level().unwrap(), Level::DEBUG);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.span_events, SpanEvents::Lifecycle);
        assert!(!config.file_info);

        let config = LoggingConfig::default()
            .with_level("loud")
            .with_format(LogFormat::Compact);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(toml::from_str::<LoggingConfig>("format = \"xml\"").is_err());
    }

    #[test]
    fn test_setup_rejects_bad_level() {
        let config = LoggingConfig::default().with_level("chatty");
        assert!(matches!(setup_logging(&config), Err(Error::Config(_))));
    }
}
