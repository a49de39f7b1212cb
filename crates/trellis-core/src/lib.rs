//! # Trellis Core
//!
//! Core types shared by every Trellis crate:
//!
//! - [`Request`] / [`Response`] - The transport boundary
//! - [`RequestId`] - UUID v7 correlation id
//! - [`TrellisError`] - Standard error type
//! - [`Container`](di::Container) - Typed services and `"type:name"` lookups
//! - [`Record`] - Domain objects that serializers render
//! - [`Payload`] - What an action hands to a serializer

#![doc(html_root_url = "https://docs.rs/trellis-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
pub mod di;
mod error;
pub mod fixtures;
mod model;
mod payload;
mod request;
mod response;

pub use context::{RequestId, REQUEST_ID_HEADER};
pub use di::{Container, InjectionError};
pub use error::{ErrorCategory, TrellisError, TrellisResult};
pub use model::{id_string, Record, RecordRef, Related, RelationshipKind};
pub use payload::{Payload, PayloadItem, Shape};
pub use request::{MatchedRoute, Request};
pub use response::Response;
pub use trellis_router::Params;
