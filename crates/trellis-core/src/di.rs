//! Dependency lookup container.
//!
//! The container holds two kinds of entries:
//!
//! - **Services**, keyed by their Rust type and stored as `Arc<T>`. These are
//!   application singletons such as a database pool.
//! - **Named entries**, keyed by a `"type:name"` specifier such as
//!   `"serializer:book"` or `"action:books/show"`. The router and actions
//!   resolve parsers, serializers, views and action factories this way.
//!
//! Named lookups come in two flavours: [`Container::lookup`] is loose and
//! returns `None` when nothing is registered, [`Container::lookup_required`]
//! is strict and returns an [`InjectionError`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use trellis_core::di::Container;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! let mut container = Container::new();
//! container.register(Arc::new(Database { url: "postgres://localhost/db".into() }));
//! container.register_named("config:greeting", String::from("hello"));
//!
//! let db: Arc<Database> = container.resolve().unwrap();
//! assert_eq!(db.url, "postgres://localhost/db");
//!
//! let greeting: Option<String> = container.lookup("config:greeting");
//! assert_eq!(greeting.as_deref(), Some("hello"));
//! assert!(container.lookup::<String>("config:missing").is_none());
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::error::TrellisError;

/// Error when a dependency cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to inject {specifier}: {reason}")]
pub struct InjectionError {
    /// The specifier or type name that could not be resolved.
    pub specifier: String,
    /// The reason for the failure.
    pub reason: String,
}

impl InjectionError {
    /// Creates an error for a specifier with no registration.
    pub fn not_registered(specifier: impl Into<String>) -> Self {
        Self {
            specifier: specifier.into(),
            reason: "not registered".to_string(),
        }
    }

    /// Creates an error with a custom reason.
    pub fn custom(specifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            specifier: specifier.into(),
            reason: reason.into(),
        }
    }
}

impl From<InjectionError> for TrellisError {
    fn from(error: InjectionError) -> Self {
        Self::configuration(error.to_string())
    }
}

/// Splits a `"type:name"` specifier into its parts.
///
/// ```rust
/// use trellis_core::di::split_specifier;
///
/// assert_eq!(split_specifier("action:books/show"), Some(("action", "books/show")));
/// assert_eq!(split_specifier("books"), None);
/// ```
#[must_use]
pub fn split_specifier(specifier: &str) -> Option<(&str, &str)> {
    let (kind, name) = specifier.split_once(':')?;
    if kind.is_empty() || name.is_empty() {
        return None;
    }
    Some((kind, name))
}

/// A dependency lookup container.
///
/// Built once at application startup and shared read-only afterwards, usually
/// behind an `Arc`.
#[derive(Default)]
pub struct Container {
    services: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    named: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Container {
    /// Creates a new empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a typed service.
    pub fn register<T: Send + Sync + 'static>(&mut self, service: Arc<T>) {
        self.services.insert(TypeId::of::<T>(), service);
    }

    /// Resolves a typed service, or `None` if it is not registered.
    #[must_use]
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|s| s.clone().downcast::<T>().ok())
    }

    /// Resolves a typed service or returns an error.
    pub fn resolve_required<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, InjectionError> {
        self.resolve()
            .ok_or_else(|| InjectionError::not_registered(std::any::type_name::<T>()))
    }

    /// Checks if a typed service is registered.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    /// Registers a value under a `"type:name"` specifier, replacing any
    /// previous entry.
    ///
    /// Trait objects are registered as their shared handle, for example an
    /// `Arc<dyn Serializer>`.
    pub fn register_named<T: Send + Sync + 'static>(&mut self, specifier: impl Into<String>, value: T) {
        let specifier = specifier.into();
        tracing::trace!(specifier = %specifier, "registered named entry");
        self.named.insert(specifier, Arc::new(value));
    }

    /// Loose lookup: returns a clone of the entry, or `None` if nothing of
    /// type `T` is registered under the specifier.
    #[must_use]
    pub fn lookup<T: Clone + 'static>(&self, specifier: &str) -> Option<T> {
        self.named
            .get(specifier)
            .and_then(|entry| entry.downcast_ref::<T>())
            .cloned()
    }

    /// Strict lookup: like [`lookup`](Self::lookup) but unresolved or
    /// mistyped entries are errors.
    pub fn lookup_required<T: Clone + 'static>(&self, specifier: &str) -> Result<T, InjectionError> {
        if split_specifier(specifier).is_none() {
            return Err(InjectionError::custom(
                specifier,
                "expected a `type:name` specifier",
            ));
        }
        let entry = self
            .named
            .get(specifier)
            .ok_or_else(|| InjectionError::not_registered(specifier))?;
        entry.downcast_ref::<T>().cloned().ok_or_else(|| {
            InjectionError::custom(
                specifier,
                format!("registered entry is not a {}", std::any::type_name::<T>()),
            )
        })
    }

    /// Returns `true` if anything is registered under the specifier.
    #[must_use]
    pub fn has(&self, specifier: &str) -> bool {
        self.named.contains_key(specifier)
    }

    /// Returns the number of registered services and named entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len() + self.named.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.named.is_empty()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.named.keys().collect();
        names.sort();
        f.debug_struct("Container")
            .field("service_count", &self.services.len())
            .field("named", &names)
            .finish()
    }
}
