//! Serializer schemas and per-render options.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a related record is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Render the full related record: inline for flat output, sideloaded
    /// into `included` for JSON-API.
    Embed,
    /// Render only identifiers.
    #[default]
    Id,
}

/// Relationship name to its rendering configuration, in output order.
pub type Relationships = IndexMap<String, RelationshipConfig>;

/// Rendering configuration for one relationship.
///
/// `attributes` and `relationships` scope the render options used for the
/// related records themselves; when unset the related type's own serializer
/// schema applies.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipConfig {
    /// Representation strategy.
    pub strategy: Strategy,
    /// Output key, if different from the relationship name.
    pub key: Option<String>,
    /// Serializer name for the related records, overriding the type lookup.
    pub serializer: Option<String>,
    /// Attribute whitelist for the related records.
    pub attributes: Option<Vec<String>>,
    /// Relationship map for the related records.
    pub relationships: Option<Relationships>,
}

impl RelationshipConfig {
    /// A relationship rendered as full records.
    #[must_use]
    pub fn embed() -> Self {
        Self {
            strategy: Strategy::Embed,
            ..Self::default()
        }
    }

    /// A relationship rendered as identifiers only.
    #[must_use]
    pub fn ids() -> Self {
        Self::default()
    }

    /// Sets the output key.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets the serializer used for related records.
    pub fn serializer(mut self, name: impl Into<String>) -> Self {
        self.serializer = Some(name.into());
        self
    }

    /// Overrides the attribute whitelist of related records.
    pub fn attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    /// Adds a nested relationship for related records.
    pub fn relationship(mut self, name: impl Into<String>, config: RelationshipConfig) -> Self {
        self.relationships
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), config);
        self
    }

    /// Returns the output key for a relationship named `name`.
    #[must_use]
    pub fn key_for<'a>(&'a self, name: &'a str) -> &'a str {
        self.key.as_deref().unwrap_or(name)
    }
}

/// A serializer's class-level whitelist.
///
/// # Example
///
/// ```
/// use trellis_serializer::{RelationshipConfig, Schema};
///
/// let schema = Schema::new()
///     .attributes(["title", "body"])
///     .relationship("comments", RelationshipConfig::embed());
///
/// assert_eq!(schema.attributes, vec!["title", "body"]);
/// assert!(schema.relationships.contains_key("comments"));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    /// Attributes to render, in order.
    pub attributes: Vec<String>,
    /// Relationships to render, in order.
    pub relationships: Relationships,
}

impl Schema {
    /// An empty schema: only the id is rendered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the attribute whitelist.
    pub fn attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a relationship.
    pub fn relationship(mut self, name: impl Into<String>, config: RelationshipConfig) -> Self {
        self.relationships.insert(name.into(), config);
        self
    }

    /// Applies call-site overrides. Each present override replaces the
    /// corresponding list outright.
    #[must_use]
    pub fn overridden(
        &self,
        attributes: Option<&Vec<String>>,
        relationships: Option<&Relationships>,
    ) -> Self {
        Self {
            attributes: attributes.unwrap_or(&self.attributes).clone(),
            relationships: relationships.unwrap_or(&self.relationships).clone(),
        }
    }
}

/// Options for a single render call.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use trellis_serializer::RenderOptions;
///
/// let options = RenderOptions::new()
///     .serializer("flat")
///     .attributes(["title"])
///     .meta(json!({"total": 1}));
///
/// assert_eq!(options.serializer.as_deref(), Some("flat"));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderOptions {
    /// Render through the named view instead of a serializer.
    pub view: Option<String>,
    /// Serializer name, overriding type-based selection.
    pub serializer: Option<String>,
    /// Attribute whitelist override.
    pub attributes: Option<Vec<String>>,
    /// Relationship map override.
    pub relationships: Option<Relationships>,
    /// Top-level document metadata.
    pub meta: Option<Value>,
    /// Top-level document links.
    pub links: Option<Value>,
}

impl RenderOptions {
    /// Default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders through a view.
    pub fn view(mut self, name: impl Into<String>) -> Self {
        self.view = Some(name.into());
        self
    }

    /// Selects a serializer by name.
    pub fn serializer(mut self, name: impl Into<String>) -> Self {
        self.serializer = Some(name.into());
        self
    }

    /// Overrides the attribute whitelist.
    pub fn attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    /// Overrides the relationship map, one entry at a time.
    pub fn relationship(mut self, name: impl Into<String>, config: RelationshipConfig) -> Self {
        self.relationships
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), config);
        self
    }

    /// Sets top-level metadata.
    pub fn meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Sets top-level links.
    pub fn links(mut self, links: Value) -> Self {
        self.links = Some(links);
        self
    }

    /// The schema to render top-level records with.
    #[must_use]
    pub fn schema_over(&self, base: &Schema) -> Schema {
        base.overridden(self.attributes.as_ref(), self.relationships.as_ref())
    }
}
