//! # Trellis
//!
//! **MVC request dispatch and serialization for async Rust services**
//!
//! - **Routing**: `:param`, `*wildcard` and `(optional)` patterns, conventional
//!   resource routes, namespaces and reverse routing
//! - **Actions**: one fresh handler per request with inherited, cached
//!   before/after filter chains
//! - **Serialization**: flat JSON and JSON-API 1.0 documents with sideloading
//!   and `included` deduplication
//! - **Recovery**: every failure is rendered by a single error action
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use trellis::prelude::*;
//!
//! let config = ConfigLoader::new()
//!     .with_optional_file("trellis.toml")?
//!     .with_env_prefix("TRELLIS")
//!     .load()?;
//! init_logging(&config.logging.to_log_config())?;
//!
//! let mut container = Container::new();
//! container.register_action::<ListBooks>("books/list");
//!
//! let mut builder = RouterBuilder::new(container)
//!     .configure(&config)
//!     .with_standard_components();
//! builder.get("/books", "books/list")?;
//! let router = builder.build()?;
//!
//! let response = router.handle(Request::from_http(http_request)).await?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → Middleware → Route match → Parser → Before filters → Responder
//!                                                                   ↓
//! Response ← Serializer / View ← render ← After filters ←───────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/trellis/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use trellis_core as core;

// Re-export routing types
pub use trellis_router as router;

// Re-export serializers
pub use trellis_serializer as serializer;

// Re-export action types
pub use trellis_action as action;

// Re-export dispatch types
pub use trellis_server as server;

// Re-export configuration
pub use trellis_config as config;

// Re-export telemetry
pub use trellis_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use trellis::prelude::*;
///
/// let builder = RouterBuilder::new(Container::new()).with_standard_components();
/// let router = builder.build().unwrap();
/// assert!(router.routes().is_empty());
/// ```
pub mod prelude {
    pub use trellis_core::{
        Container, Payload, Record, RecordRef, Related, RelationshipKind, Request, RequestId,
        Response, TrellisError, TrellisResult,
    };

    // Re-export routing types
    pub use trellis_router::{Params, ResourceOptions};

    // Re-export serializers
    pub use trellis_serializer::{
        FlatSerializer, JsonApiSerializer, RelationshipConfig, RenderOptions, Schema, Serializer,
        SerializerRegistry,
    };

    // Re-export action types
    pub use trellis_action::{
        Action, ActionContext, ActionRegistry, FilterLevel, FilterResult, ParserChoice, View,
    };

    // Re-export dispatch types
    pub use trellis_server::{FnMiddleware, Middleware, RouteDsl, Router, RouterBuilder};

    // Re-export configuration and logging setup
    pub use trellis_config::{ConfigLoader, TrellisConfig};
    pub use trellis_telemetry::init_logging;
}
