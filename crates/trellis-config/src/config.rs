//! The top-level configuration and its presets.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, LogFormat, LoggingConfig, SerializationConfig, ServerConfig};

/// Complete Trellis configuration.
///
/// # Example
///
/// ```
/// use trellis_config::TrellisConfig;
///
/// let config = TrellisConfig::default();
/// assert_eq!(config.serialization.default_serializer, "application");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TrellisConfig {
    /// Dispatch settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Parser and serializer defaults.
    #[serde(default)]
    pub serialization: SerializationConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TrellisConfig {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> TrellisConfigBuilder {
        TrellisConfigBuilder::default()
    }

    /// Checks values serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.request_timeout_ms == Some(0) {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_ms",
                "must be greater than zero; omit it to disable the deadline",
            ));
        }

        for (field, value) in [
            ("serialization.default_serializer", &self.serialization.default_serializer),
            ("serialization.default_parser", &self.serialization.default_parser),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::invalid_value(field, "must not be empty"));
            }
        }

        if self.logging.enabled {
            trellis_telemetry::logging::create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }

        Ok(())
    }

    /// Development preset: pretty debug logs, error details exposed.
    ///
    /// # Example
    ///
    /// ```
    /// use trellis_config::TrellisConfig;
    ///
    /// let config = TrellisConfig::development();
    /// assert!(config.server.expose_error_details);
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.include_location = true;
        config.server.expose_error_details = true;
        config
    }

    /// Production preset: JSON info logs, error details hidden, 30s deadline.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.server.expose_error_details = false;
        config.server.request_timeout_ms = Some(30_000);
        config
    }
}

/// Builder for [`TrellisConfig`].
#[derive(Debug, Default)]
pub struct TrellisConfigBuilder {
    server: Option<ServerConfig>,
    serialization: Option<SerializationConfig>,
    logging: Option<LoggingConfig>,
}

impl TrellisConfigBuilder {
    /// Sets the server section.
    #[must_use]
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.server = Some(server);
        self
    }

    /// Sets the serialization section.
    #[must_use]
    pub fn serialization(mut self, serialization: SerializationConfig) -> Self {
        self.serialization = Some(serialization);
        self
    }

    /// Sets the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Builds the configuration; unset sections take their defaults.
    #[must_use]
    pub fn build(self) -> TrellisConfig {
        TrellisConfig {
            server: self.server.unwrap_or_default(),
            serialization: self.serialization.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        assert!(TrellisConfig::development().validate().is_ok());
        assert!(TrellisConfig::production().validate().is_ok());
        assert_eq!(TrellisConfig::production().server.request_timeout_ms, Some(30_000));
    }

    #[test]
    fn test_zero_timeout_is_invalid() {
        let config = TrellisConfig::builder()
            .server(ServerConfig {
                request_timeout_ms: Some(0),
                ..ServerConfig::default()
            })
            .build();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.request_timeout_ms"));
    }

    #[test]
    fn test_empty_default_serializer_is_invalid() {
        let config = TrellisConfig::builder()
            .serialization(SerializationConfig {
                default_serializer: " ".to_string(),
                ..SerializationConfig::default()
            })
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_log_level_is_invalid() {
        let config = TrellisConfig::builder()
            .logging(LoggingConfig {
                level: "trellis=loud".to_string(),
                ..LoggingConfig::default()
            })
            .build();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }
}
