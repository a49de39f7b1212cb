//! Error types for Trellis.
//!
//! [`TrellisError`] is the single error type that flows through routing,
//! action execution and serialization. Every variant maps to an
//! [`ErrorCategory`], and every category to a default HTTP status code, so
//! an error can always be rendered as a document by the normal serializer
//! pipeline.
//!
//! | Category         | Status | Raised by                                             |
//! |------------------|--------|-------------------------------------------------------|
//! | `Validation`     | 400    | parsers, application code                             |
//! | `Authentication` | 401    | application filters                                   |
//! | `Authorization`  | 403    | application filters                                   |
//! | `NotFound`       | 404    | the router when no route matches, application code    |
//! | `Conflict`       | 409    | application code                                      |
//! | `Timeout`        | 504    | the router when a request deadline expires            |
//! | `Internal`       | 500    | application code, unexpected failures                 |
//! | `Configuration`  | 500    | unresolved names, undefined filters or relationships  |

use std::fmt;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`TrellisError`].
pub type TrellisResult<T> = Result<T, TrellisError>;

/// Categories of errors for classification and status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed or invalid input.
    Validation,
    /// Missing or invalid credentials.
    Authentication,
    /// Permission denied.
    Authorization,
    /// No route matched, or a resource does not exist.
    NotFound,
    /// Conflicting modification.
    Conflict,
    /// The request deadline expired.
    Timeout,
    /// Unexpected failure.
    Internal,
    /// Programmer error in application wiring.
    Configuration,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Authorization => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal | Self::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Timeout => "timeout",
            Self::Internal => "internal",
            Self::Configuration => "configuration",
        };
        f.write_str(name)
    }
}

/// Standard error type for Trellis.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use trellis_core::{ErrorCategory, TrellisError};
///
/// let error = TrellisError::not_found_resource("book", "42");
/// assert_eq!(error.category(), ErrorCategory::NotFound);
/// assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
/// assert_eq!(error.error_code(), "NOT_FOUND");
/// assert_eq!(error.title(), "Not Found");
/// assert_eq!(error.detail(), "book with ID '42' not found");
/// ```
#[derive(Error, Debug)]
pub enum TrellisError {
    /// Request validation failed.
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable error message.
        message: String,
    },

    /// Authentication failed.
    #[error("Authentication error: {message}")]
    Authentication {
        /// Human-readable error message.
        message: String,
    },

    /// Authorization denied.
    #[error("Authorization denied: {message}")]
    Authorization {
        /// Human-readable error message.
        message: String,
    },

    /// Route or resource not found.
    #[error("Not found: {message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
        /// The type of resource that was not found.
        resource_type: Option<String>,
        /// The identifier of the resource.
        resource_id: Option<String>,
    },

    /// Conflicting modification.
    #[error("Conflict: {message}")]
    Conflict {
        /// Human-readable error message.
        message: String,
    },

    /// Request deadline expired.
    #[error("Timeout: {message}")]
    Timeout {
        /// Human-readable error message.
        message: String,
    },

    /// Internal server error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Application wiring is wrong: an unresolvable name, a filter with no
    /// definition, a relationship the model does not define, or a payload
    /// mixing records and errors.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Human-readable error message.
        message: String,
    },

    /// An action finished without rendering a response.
    #[error("Action `{action}` did not render anything")]
    RenderOmitted {
        /// The action that failed to render.
        action: String,
    },
}

impl TrellisError {
    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates an authentication error.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Creates an authorization error.
    #[must_use]
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            resource_type: None,
            resource_id: None,
        }
    }

    /// Creates a not found error with resource context.
    #[must_use]
    pub fn not_found_resource(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        let resource_type = resource_type.into();
        let resource_id = resource_id.into();
        Self::NotFound {
            message: format!("{resource_type} with ID '{resource_id}' not found"),
            resource_type: Some(resource_type),
            resource_id: Some(resource_id),
        }
    }

    /// Creates the routing error for a request no route accepts.
    #[must_use]
    pub fn route_not_found(method: &http::Method, path: &str) -> Self {
        Self::not_found(format!("no route matches {method} {path}"))
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a render-omission error for an action.
    #[must_use]
    pub fn render_omitted(action: impl Into<String>) -> Self {
        Self::RenderOmitted {
            action: action.into(),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Authentication { .. } => ErrorCategory::Authentication,
            Self::Authorization { .. } => ErrorCategory::Authorization,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Internal { .. } => ErrorCategory::Internal,
            Self::Configuration { .. } | Self::RenderOmitted { .. } => {
                ErrorCategory::Configuration
            }
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Authentication { .. } => "AUTHENTICATION_ERROR",
            Self::Authorization { .. } => "AUTHORIZATION_DENIED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict { .. } => "CONFLICT",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Internal { .. } => "INTERNAL_ERROR",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::RenderOmitted { .. } => "RENDER_OMITTED",
        }
    }

    /// Returns a short, human-readable summary: the status's reason phrase.
    #[must_use]
    pub fn title(&self) -> &'static str {
        self.status_code().canonical_reason().unwrap_or("Error")
    }

    /// Returns the occurrence-specific explanation.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Validation { message }
            | Self::Authentication { message }
            | Self::Authorization { message }
            | Self::NotFound { message, .. }
            | Self::Conflict { message }
            | Self::Timeout { message }
            | Self::Internal { message, .. }
            | Self::Configuration { message } => message.clone(),
            Self::RenderOmitted { .. } => "handler did not render anything".to_string(),
        }
    }

    /// Returns a client-safe stand-in for server-side failures.
    ///
    /// Internal and configuration errors collapse into a generic internal
    /// error; `None` means the error is already safe to show.
    #[must_use]
    pub fn redacted(&self) -> Option<Self> {
        match self.category() {
            ErrorCategory::Internal | ErrorCategory::Configuration => {
                Some(Self::internal("internal server error"))
            }
            _ => None,
        }
    }
}
