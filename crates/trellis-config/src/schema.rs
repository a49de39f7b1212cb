//! Configuration section types.

use serde::{Deserialize, Serialize};
use trellis_telemetry::LogConfig;

/// Dispatch settings.
///
/// # Example
///
/// ```
/// use trellis_config::ServerConfig;
///
/// let config = ServerConfig {
///     request_timeout_ms: Some(5_000),
///     expose_error_details: false,
/// };
/// assert_eq!(config.request_timeout().unwrap().as_secs(), 5);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Per-request deadline in milliseconds. `None` disables it.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,

    /// Render internal error messages to clients verbatim.
    #[serde(default)]
    pub expose_error_details: bool,
}

impl ServerConfig {
    /// The deadline as a [`Duration`](std::time::Duration).
    #[must_use]
    pub fn request_timeout(&self) -> Option<std::time::Duration> {
        self.request_timeout_ms.map(std::time::Duration::from_millis)
    }
}

/// Parser and serializer defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SerializationConfig {
    /// Serializer used when nothing more specific is registered.
    #[serde(default = "default_application")]
    pub default_serializer: String,

    /// Parser used by actions that do not pick one.
    #[serde(default = "default_application")]
    pub default_parser: String,

    /// Dasherize JSON-API attribute and relationship names.
    #[serde(default = "default_true")]
    pub dasherize: bool,
}

impl Default for SerializationConfig {
    fn default() -> Self {
        Self {
            default_serializer: default_application(),
            default_parser: default_application(),
            dasherize: true,
        }
    }
}

fn default_application() -> String {
    "application".to_string()
}

const fn default_true() -> bool {
    true
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (trace, debug, info, warn, error, or per-target).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            include_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    /// Converts into the telemetry crate's logging settings.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            json_format: self.format == LogFormat::Json,
            span_events: self.format == LogFormat::Pretty,
            file_line_info: self.include_location,
            include_target: true,
        }
    }
}
