//! JSON-API 1.0 output.

use async_trait::async_trait;
use futures_util::future::{try_join_all, BoxFuture, FutureExt};
use serde_json::{json, Map, Value};
use trellis_core::{
    id_string, Payload, Record, RecordRef, Related, Shape, TrellisError, TrellisResult,
};

use crate::document::Document;
use crate::inflect;
use crate::options::{RenderOptions, Schema, Strategy};
use crate::serializer::{
    load_related, EmbedPath, RenderedResource, SerializeContext, Serializer, JSON_API_CONTENT_TYPE,
};

/// Renders payloads as JSON-API documents.
///
/// The document is built in a fixed order: primary data, sideloaded
/// resources, top-level `meta`, top-level `links`, the `jsonapi` version
/// member, and finally deduplication of `included` by `(type, id)`.
///
/// Relationships always render as resource linkage. A relationship with
/// [`Strategy::Embed`] additionally sideloads the related resources into
/// `included`, rendered by the related type's own serializer.
/// Attribute and relationship names are dasherized unless disabled with
/// [`dasherize`](Self::dasherize).
#[derive(Debug, Clone)]
pub struct JsonApiSerializer {
    schema: Schema,
    dasherize: bool,
}

impl Default for JsonApiSerializer {
    fn default() -> Self {
        Self::new(Schema::new())
    }
}

impl JsonApiSerializer {
    /// Creates a serializer with the given whitelist.
    #[must_use]
    pub const fn new(schema: Schema) -> Self {
        Self {
            schema,
            dasherize: true,
        }
    }

    /// Enables or disables dasherizing member names.
    #[must_use]
    pub fn dasherize(mut self, enabled: bool) -> Self {
        self.dasherize = enabled;
        self
    }

    fn member_name(&self, name: &str) -> String {
        if self.dasherize {
            inflect::dasherize(name)
        } else {
            name.to_string()
        }
    }

    fn render_resource<'a>(
        &'a self,
        record: RecordRef,
        schema: Schema,
        cx: &'a SerializeContext<'a>,
        path: EmbedPath,
    ) -> BoxFuture<'a, TrellisResult<RenderedResource>> {
        async move {
            let path = path.descend(record.as_ref());

            let mut resource = identifier(record.as_ref());
            let attributes: Map<String, Value> = schema
                .attributes
                .iter()
                .filter_map(|name| {
                    record
                        .attribute(name)
                        .map(|value| (self.member_name(name), value))
                })
                .collect();
            if !attributes.is_empty() {
                resource.insert("attributes".to_string(), Value::Object(attributes));
            }

            let mut relationships = Map::new();
            let mut included = Vec::new();
            for (name, config) in &schema.relationships {
                let related = load_related(record.as_ref(), name).await?;
                relationships.insert(
                    self.member_name(config.key_for(name)),
                    json!({ "data": linkage(&related) }),
                );
                if config.strategy == Strategy::Embed {
                    let sideloads = related
                        .records()
                        .filter(|r| !path.contains(r.as_ref()))
                        .map(|r| cx.render_related(r, config, &path));
                    for rendered in try_join_all(sideloads).await? {
                        included.push(rendered.resource);
                        included.extend(rendered.included);
                    }
                }
            }
            if !relationships.is_empty() {
                resource.insert("relationships".to_string(), Value::Object(relationships));
            }
            if let Some(meta) = record.meta() {
                resource.insert("meta".to_string(), meta);
            }

            Ok(RenderedResource {
                resource: Value::Object(resource),
                included,
            })
        }
        .boxed()
    }

    async fn render_primary(
        &self,
        document: &mut Document,
        records: Vec<&RecordRef>,
        single: bool,
        schema: &Schema,
        cx: &SerializeContext<'_>,
    ) -> TrellisResult<Vec<Value>> {
        let rendered = try_join_all(records.into_iter().map(|record| {
            self.render_resource(record.clone(), schema.clone(), cx, EmbedPath::new())
        }))
        .await?;

        let mut resources = Vec::with_capacity(rendered.len());
        let mut included = Vec::new();
        for item in rendered {
            resources.push(item.resource);
            included.extend(item.included);
        }
        let data = if single {
            resources.pop().unwrap_or(Value::Null)
        } else {
            Value::Array(resources)
        };
        document.set_data(data)?;
        Ok(included)
    }
}

fn identifier(record: &dyn Record) -> Map<String, Value> {
    let mut object = Map::new();
    object.insert(
        "type".to_string(),
        Value::String(inflect::resource_type(record.resource_type())),
    );
    object.insert("id".to_string(), Value::String(id_string(&record.id())));
    object
}

fn linkage(related: &Related) -> Value {
    match related {
        Related::One(record) => record
            .as_ref()
            .map_or(Value::Null, |r| Value::Object(identifier(r.as_ref()))),
        Related::Many(records) => Value::Array(
            records
                .iter()
                .map(|r| Value::Object(identifier(r.as_ref())))
                .collect(),
        ),
    }
}

fn error_object(error: &TrellisError) -> Value {
    json!({
        "status": error.status_code().as_str(),
        "code": error.error_code(),
        "title": error.title(),
        "detail": error.detail(),
    })
}

#[async_trait]
impl Serializer for JsonApiSerializer {
    fn content_type(&self) -> &'static str {
        JSON_API_CONTENT_TYPE
    }

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
        let mut document = Document::new();

        let included = match payload.shape()? {
            Shape::Record(record) => {
                self.render_primary(&mut document, vec![record], true, &schema, cx)
                    .await?
            }
            Shape::Records(records) => {
                self.render_primary(&mut document, records, false, &schema, cx)
                    .await?
            }
            Shape::Error(error) => {
                document.set_errors(vec![error_object(error)])?;
                Vec::new()
            }
            Shape::Errors(errors) => {
                document.set_errors(errors.into_iter().map(error_object).collect())?;
                Vec::new()
            }
            Shape::Value(value) => {
                document.set_data(value.clone())?;
                Vec::new()
            }
        };

        for resource in included {
            document.push_included(resource);
        }
        if let Some(meta) = &options.meta {
            document.set_meta(meta.clone());
        }
        if let Some(links) = &options.links {
            document.set_links(links.clone());
        } else if let Some(request) = cx.request() {
            document.set_links(json!({ "self": request.path() }));
        }
        document.stamp_version();
        document.dedupe_included();

        tracing::trace!(included = document.included().len(), "rendered JSON-API document");
        document.into_value()
    }

    async fn render_related(
        &self,
        record: RecordRef,
        schema: Schema,
        cx: &SerializeContext<'_>,
        path: EmbedPath,
    ) -> TrellisResult<RenderedResource> {
        self.render_resource(record, schema, cx, path).await
    }
}
