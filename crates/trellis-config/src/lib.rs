//! Typed configuration for Trellis.
//!
//! [`TrellisConfig`] has three sections:
//!
//! - [`ServerConfig`]: request deadline, error detail exposure
//! - [`SerializationConfig`]: default serializer and parser names, JSON-API
//!   key dasherizing
//! - [`LoggingConfig`]: level, format, source locations
//!
//! Unknown fields are rejected. [`ConfigLoader`] layers defaults, a file and
//! environment variables.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! request_timeout_ms = 30000
//! expose_error_details = false
//!
//! [serialization]
//! default_serializer = "application"
//! default_parser = "application"
//! dasherize = true
//!
//! [logging]
//! level = "info"
//! format = "json"
//! include_location = false
//! ```
//!
//! # Environment Variable Overrides
//!
//! Keys use `PREFIX__SECTION__KEY`, e.g. `TRELLIS__SERVER__REQUEST_TIMEOUT_MS=5000`
//! or `TRELLIS__LOGGING__FORMAT=pretty`.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{TrellisConfig, TrellisConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{LogFormat, LoggingConfig, SerializationConfig, ServerConfig};
