//! Plain JSON output.

use async_trait::async_trait;
use futures_util::future::{try_join_all, BoxFuture, FutureExt};
use serde_json::{json, Map, Value};
use trellis_core::{Payload, RecordRef, Related, Shape, TrellisError, TrellisResult};

use crate::options::{RelationshipConfig, RenderOptions, Schema, Strategy};
use crate::serializer::{load_related, EmbedPath, RenderedResource, SerializeContext, Serializer};

/// Renders records as `{ id, ...attributes, ...relationships }`.
///
/// Relationships with [`Strategy::Embed`] are rendered inline by the
/// serializer registered for the related type; with
/// [`Strategy::Id`] only the id (or list of ids) is emitted. A record that is
/// already being rendered further up the same branch is emitted as its id.
///
/// Errors render as `{ status, code, message }`; raw JSON values pass
/// through untouched.
///
/// # Example
///
/// ```
/// # tokio_test::block_on(async {
/// use serde_json::json;
/// use trellis_core::fixtures::MemoryRecord;
/// use trellis_core::{Container, Payload};
/// use trellis_serializer::{FlatSerializer, RenderOptions, Schema, SerializeContext, Serializer};
///
/// let serializer = FlatSerializer::new(Schema::new().attributes(["title"]));
/// let post = MemoryRecord::new("post", 1)
///     .with_attribute("title", "foo")
///     .with_attribute("content", "bar")
///     .into_ref();
///
/// let container = Container::new();
/// let cx = SerializeContext::new(&container);
/// let body = serializer
///     .serialize(&Payload::record(post), &cx, &RenderOptions::new())
///     .await
///     .unwrap();
///
/// assert_eq!(body, json!({"id": 1, "title": "foo"}));
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct FlatSerializer {
    schema: Schema,
}

impl FlatSerializer {
    /// Creates a serializer with the given whitelist.
    #[must_use]
    pub const fn new(schema: Schema) -> Self {
        Self { schema }
    }

    fn render_record<'a>(
        &'a self,
        record: RecordRef,
        schema: Schema,
        cx: &'a SerializeContext<'a>,
        path: EmbedPath,
    ) -> BoxFuture<'a, TrellisResult<Value>> {
        async move {
            let path = path.descend(record.as_ref());

            let mut object = Map::new();
            object.insert("id".to_string(), record.id());
            for attribute in &schema.attributes {
                if let Some(value) = record.attribute(attribute) {
                    object.insert(attribute.clone(), value);
                }
            }

            for (name, config) in &schema.relationships {
                let related = load_related(record.as_ref(), name).await?;
                let value = match config.strategy {
                    Strategy::Id => ids(&related),
                    Strategy::Embed => self.embed(&related, config, cx, &path).await?,
                };
                object.insert(config.key_for(name).to_string(), value);
            }

            Ok(Value::Object(object))
        }
        .boxed()
    }

    async fn embed(
        &self,
        related: &Related,
        config: &RelationshipConfig,
        cx: &SerializeContext<'_>,
        path: &EmbedPath,
    ) -> TrellisResult<Value> {
        match related {
            Related::One(None) => Ok(Value::Null),
            Related::One(Some(record)) => self.embed_one(record, config, cx, path).await,
            Related::Many(records) => {
                let rendered = try_join_all(
                    records
                        .iter()
                        .map(|record| self.embed_one(record, config, cx, path)),
                )
                .await?;
                Ok(Value::Array(rendered))
            }
        }
    }

    async fn embed_one(
        &self,
        record: &RecordRef,
        config: &RelationshipConfig,
        cx: &SerializeContext<'_>,
        path: &EmbedPath,
    ) -> TrellisResult<Value> {
        if path.contains(record.as_ref()) {
            return Ok(record.id());
        }
        Ok(cx.render_related(record, config, path).await?.resource)
    }
}

fn ids(related: &Related) -> Value {
    match related {
        Related::One(record) => record.as_ref().map_or(Value::Null, |r| r.id()),
        Related::Many(records) => Value::Array(records.iter().map(|r| r.id()).collect()),
    }
}

fn error_object(error: &TrellisError) -> Value {
    json!({
        "status": error.status_code().as_u16(),
        "code": error.error_code(),
        "message": error.detail(),
    })
}

#[async_trait]
impl Serializer for FlatSerializer {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn serialize(
        &self,
        payload: &Payload,
        cx: &SerializeContext<'_>,
        options: &RenderOptions,
    ) -> TrellisResult<Value> {
        let schema = options.schema_over(&self.schema);
        match payload.shape()? {
            Shape::Record(record) => {
                self.render_record(record.clone(), schema, cx, EmbedPath::new())
                    .await
            }
            Shape::Records(records) => {
                let rendered = try_join_all(records.into_iter().map(|record| {
                    self.render_record(record.clone(), schema.clone(), cx, EmbedPath::new())
                }))
                .await?;
                Ok(Value::Array(rendered))
            }
            Shape::Error(error) => Ok(error_object(error)),
            Shape::Errors(errors) => Ok(Value::Array(
                errors.into_iter().map(error_object).collect(),
            )),
            Shape::Value(value) => Ok(value.clone()),
        }
    }

    async fn render_related(
        &self,
        record: RecordRef,
        schema: Schema,
        cx: &SerializeContext<'_>,
        path: EmbedPath,
    ) -> TrellisResult<RenderedResource> {
        let resource = self.render_record(record, schema, cx, path).await?;
        Ok(RenderedResource {
            resource,
            included: Vec::new(),
        })
    }
}
