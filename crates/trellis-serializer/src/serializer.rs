//! The serializer contract and the lookups serializers share.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use trellis_core::{
    id_string, Container, Payload, Record, RecordRef, Related, Request, TrellisError, TrellisResult,
};

use crate::options::{RelationshipConfig, RenderOptions, Schema};

/// `application/json`.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// `application/vnd.api+json`.
pub const JSON_API_CONTENT_TYPE: &str = "application/vnd.api+json";

/// Name of the serializer used when nothing more specific is registered.
pub const APPLICATION_SERIALIZER: &str = "application";

/// Shared handle to a serializer, as stored in the container.
pub type SerializerRef = Arc<dyn Serializer>;

/// Converts a [`Payload`] into a wire document.
///
/// Implementations declare a [`Schema`] (the class-level whitelist) and apply
/// the per-call overrides in [`RenderOptions`]. Records reached through a
/// relationship are handed to the serializer registered for their own type
/// through [`render_related`](Self::render_related).
#[async_trait]
pub trait Serializer: Send + Sync {
    /// Media type of the produced document.
    fn content_type(&self) -> &'static str {
        JSON_CONTENT_TYPE
    }

    /// The attribute and relationship whitelist.
    fn schema(&self) -> &Schema;

    /// Renders a payload.
    async fn serialize(
        &self,
        payload: &Payload,
        cx: &SerializeContext<'_>,
        options: &RenderOptions,
    ) -> TrellisResult<Value>;

    /// Renders a record reached through another record's relationship.
    ///
    /// `schema` is this serializer's schema with the relationship's scoped
    /// overrides applied; `path` holds the records already being rendered on
    /// the current branch. The default renders the record on its own through
    /// [`serialize`](Self::serialize) and sideloads nothing.
    async fn render_related(
        &self,
        record: RecordRef,
        schema: Schema,
        cx: &SerializeContext<'_>,
        _path: EmbedPath,
    ) -> TrellisResult<RenderedResource> {
        let options = RenderOptions {
            attributes: Some(schema.attributes),
            relationships: Some(schema.relationships),
            ..RenderOptions::default()
        };
        let resource = self.serialize(&Payload::Record(record), cx, &options).await?;
        Ok(RenderedResource {
            resource,
            included: Vec::new(),
        })
    }
}

/// A related record as rendered by its own serializer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderedResource {
    /// The rendered record.
    pub resource: Value,
    /// Records it sideloads, for serializers with an `included` section.
    pub included: Vec<Value>,
}

/// The records being rendered further up the current embedding branch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedPath(Vec<ResourceKey>);

impl EmbedPath {
    /// An empty path, for top-level records.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Whether `record` is already being rendered on this branch.
    #[must_use]
    pub fn contains(&self, record: &dyn Record) -> bool {
        self.0.contains(&ResourceKey::of(record))
    }

    /// The path below `record`.
    #[must_use]
    pub fn descend(&self, record: &dyn Record) -> Self {
        let mut keys = self.0.clone();
        keys.push(ResourceKey::of(record));
        Self(keys)
    }
}

/// What a serializer may consult while rendering.
#[derive(Debug, Clone, Copy)]
pub struct SerializeContext<'a> {
    container: &'a Container,
    request: Option<&'a Request>,
    default_serializer: &'a str,
}

impl<'a> SerializeContext<'a> {
    /// Creates a context with no request and the `application` default.
    #[must_use]
    pub const fn new(container: &'a Container) -> Self {
        Self {
            container,
            request: None,
            default_serializer: APPLICATION_SERIALIZER,
        }
    }

    /// Attaches the request being answered.
    #[must_use]
    pub const fn with_request(mut self, request: &'a Request) -> Self {
        self.request = Some(request);
        self
    }

    /// Overrides the fallback serializer name.
    #[must_use]
    pub const fn with_default_serializer(mut self, name: &'a str) -> Self {
        self.default_serializer = name;
        self
    }

    /// Returns the container.
    #[must_use]
    pub const fn container(&self) -> &'a Container {
        self.container
    }

    /// Returns the request, if rendering a response.
    #[must_use]
    pub const fn request(&self) -> Option<&'a Request> {
        self.request
    }

    /// Returns the fallback serializer name.
    #[must_use]
    pub const fn default_serializer(&self) -> &'a str {
        self.default_serializer
    }

    /// Finds the serializer for a resource type.
    ///
    /// An explicit name must resolve. Otherwise `serializer:{type}` is tried
    /// and the default serializer is the fallback, which must resolve.
    pub fn serializer_for(
        &self,
        resource_type: &str,
        explicit: Option<&str>,
    ) -> TrellisResult<SerializerRef> {
        if let Some(name) = explicit {
            return Ok(self.container.lookup_serializer(name)?);
        }
        if let Some(serializer) = self.container.serializer(resource_type) {
            return Ok(serializer);
        }
        self.fallback_serializer()
    }

    /// The default serializer, which must resolve.
    pub fn fallback_serializer(&self) -> TrellisResult<SerializerRef> {
        Ok(self.container.lookup_serializer(self.default_serializer)?)
    }

    /// Renders a related record through the serializer for its own type, or
    /// the one the relationship names.
    pub async fn render_related(
        &self,
        record: &RecordRef,
        config: &RelationshipConfig,
        path: &EmbedPath,
    ) -> TrellisResult<RenderedResource> {
        let serializer = self.serializer_for(record.resource_type(), config.serializer.as_deref())?;
        let schema = serializer
            .schema()
            .overridden(config.attributes.as_ref(), config.relationships.as_ref());
        serializer
            .render_related(record.clone(), schema, self, path.clone())
            .await
    }
}

/// Serializer registration on the [`Container`], under `serializer:{name}`.
pub trait SerializerRegistry {
    /// Registers a serializer.
    fn register_serializer<S: Serializer + 'static>(&mut self, name: &str, serializer: S);

    /// Loose lookup.
    fn serializer(&self, name: &str) -> Option<SerializerRef>;

    /// Strict lookup.
    fn lookup_serializer(&self, name: &str) -> Result<SerializerRef, trellis_core::InjectionError>;
}

impl SerializerRegistry for Container {
    fn register_serializer<S: Serializer + 'static>(&mut self, name: &str, serializer: S) {
        let serializer: SerializerRef = Arc::new(serializer);
        self.register_named(format!("serializer:{name}"), serializer);
    }

    fn serializer(&self, name: &str) -> Option<SerializerRef> {
        self.lookup(&format!("serializer:{name}"))
    }

    fn lookup_serializer(&self, name: &str) -> Result<SerializerRef, trellis_core::InjectionError> {
        self.lookup_required(&format!("serializer:{name}"))
    }
}

/// Identity of a record on the current embedding path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ResourceKey {
    resource_type: String,
    id: String,
}

impl ResourceKey {
    pub(crate) fn of(record: &dyn Record) -> Self {
        Self {
            resource_type: record.resource_type().to_string(),
            id: id_string(&record.id()),
        }
    }
}

/// Loads a relationship the schema names, failing if the record type does
/// not define it.
pub(crate) async fn load_related(record: &dyn Record, name: &str) -> TrellisResult<Related> {
    if record.relationship_kind(name).is_none() {
        return Err(TrellisError::configuration(format!(
            "serializer references relationship `{name}`, which `{}` does not define",
            record.resource_type()
        )));
    }
    record.related(name).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlatSerializer;
    use trellis_core::fixtures::MemoryRecord;

    #[test]
    fn test_serializer_for_prefers_explicit_then_type_then_default() {
        let mut container = Container::new();
        container.register_serializer("application", FlatSerializer::new(Schema::new()));
        container.register_serializer(
            "post",
            FlatSerializer::new(Schema::new().attributes(["title"])),
        );
        container.register_serializer(
            "summary",
            FlatSerializer::new(Schema::new().attributes(["summary"])),
        );
        let cx = SerializeContext::new(&container);

        let by_type = cx.serializer_for("post", None).unwrap();
        assert_eq!(by_type.schema().attributes, vec!["title"]);

        let explicit = cx.serializer_for("post", Some("summary")).unwrap();
        assert_eq!(explicit.schema().attributes, vec!["summary"]);

        let fallback = cx.serializer_for("comment", None).unwrap();
        assert!(fallback.schema().attributes.is_empty());

        let err = cx.serializer_for("post", Some("missing")).err().unwrap();
        assert!(err.detail().contains("serializer:missing"));
    }

    #[test]
    fn test_missing_default_serializer_is_configuration_error() {
        let container = Container::new();
        let cx = SerializeContext::new(&container);
        let err = cx.serializer_for("post", None).err().unwrap();
        assert_eq!(err.category(), trellis_core::ErrorCategory::Configuration);
    }

    #[tokio::test]
    async fn test_render_related_applies_scoped_overrides() {
        let mut container = Container::new();
        container.register_serializer(
            "comment",
            FlatSerializer::new(Schema::new().attributes(["body", "score"])),
        );
        let cx = SerializeContext::new(&container);
        let comment: RecordRef = MemoryRecord::new("comment", 1)
            .with_attribute("body", "hi")
            .with_attribute("score", 3)
            .into_ref();

        let rendered = cx
            .render_related(
                &comment,
                &RelationshipConfig::embed().attributes(["body"]),
                &EmbedPath::new(),
            )
            .await
            .unwrap();
        assert_eq!(rendered.resource, serde_json::json!({"id": 1, "body": "hi"}));
        assert!(rendered.included.is_empty());
    }

    #[test]
    fn test_embed_path_tracks_branch() {
        let post = MemoryRecord::new("post", 1);
        let comment = MemoryRecord::new("comment", 1);
        let path = EmbedPath::new().descend(&post);
        assert!(path.contains(&post));
        assert!(!path.contains(&comment));
        assert!(!EmbedPath::new().contains(&post));
    }

    #[tokio::test]
    async fn test_load_related_rejects_undefined_relationship() {
        let post = MemoryRecord::new("post", 1);
        let err = load_related(&post, "tags").await.unwrap_err();
        assert!(err.detail().contains("tags"));
    }
}
