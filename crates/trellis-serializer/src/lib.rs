//! Serializers for Trellis.
//!
//! A [`Serializer`] turns a [`Payload`](trellis_core::Payload) into a wire
//! document. Two are provided:
//!
//! - [`FlatSerializer`]: plain JSON objects, relationships inlined or as ids
//! - [`JsonApiSerializer`]: JSON-API 1.0 documents with resource linkage,
//!   sideloading into `included` and `(type, id)` deduplication
//!
//! Serializers are registered in the container under `serializer:{name}`,
//! where `name` is either a record type (`serializer:post`) or a free-form
//! name (`serializer:application`) used as fallback and by explicit
//! selection.
//!
//! # Example
//!
//! ```
//! # tokio_test::block_on(async {
//! use serde_json::json;
//! use trellis_core::fixtures::MemoryRecord;
//! use trellis_core::{Container, Payload};
//! use trellis_serializer::{
//!     JsonApiSerializer, RenderOptions, Schema, SerializeContext, Serializer, SerializerRegistry,
//! };
//!
//! let mut container = Container::new();
//! container.register_serializer("application", JsonApiSerializer::default());
//! container.register_serializer(
//!     "post",
//!     JsonApiSerializer::new(Schema::new().attributes(["title"])),
//! );
//!
//! let post = MemoryRecord::new("post", 1).with_attribute("title", "foo").into_ref();
//! let cx = SerializeContext::new(&container);
//! let serializer = cx.serializer_for("post", None).unwrap();
//! let body = serializer
//!     .serialize(&Payload::record(post), &cx, &RenderOptions::new())
//!     .await
//!     .unwrap();
//!
//! assert_eq!(
//!     body,
//!     json!({
//!         "data": {"type": "posts", "id": "1", "attributes": {"title": "foo"}},
//!         "jsonapi": {"version": "1.0"}
//!     })
//! );
//! # });
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod document;
mod flat;
pub mod inflect;
mod json_api;
mod options;
mod serializer;

pub use document::{Document, JSON_API_VERSION};
pub use flat::FlatSerializer;
pub use json_api::JsonApiSerializer;
pub use options::{RelationshipConfig, Relationships, RenderOptions, Schema, Strategy};
pub use serializer::{
    EmbedPath, RenderedResource, SerializeContext, Serializer, SerializerRef, SerializerRegistry,
    APPLICATION_SERIALIZER, JSON_API_CONTENT_TYPE, JSON_CONTENT_TYPE,
};
