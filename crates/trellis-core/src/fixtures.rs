//! In-memory records for tests and examples.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_core::fixtures::MemoryRecord;
//! use trellis_core::Record;
//!
//! let author = MemoryRecord::new("author", 7).with_attribute("name", "Ada").into_ref();
//! let post = MemoryRecord::new("post", 1)
//!     .with_attribute("title", "foo")
//!     .has_one("author")
//!     .into_ref();
//! post.set_one("author", Some(author));
//!
//! assert_eq!(post.resource_type(), "post");
//! assert_eq!(post.attribute("title"), Some("foo".into()));
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{TrellisError, TrellisResult};
use crate::model::{Record, RecordRef, Related, RelationshipKind};

/// A record backed by maps.
///
/// Relationships sit behind a lock so they can be wired after the records
/// are shared, which allows cyclic graphs.
pub struct MemoryRecord {
    resource_type: String,
    id: Value,
    attributes: IndexMap<String, Value>,
    relationships: RwLock<IndexMap<String, Related>>,
    meta: Option<Value>,
}

impl MemoryRecord {
    /// Creates a record with no attributes or relationships.
    pub fn new(resource_type: impl Into<String>, id: impl Into<Value>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            attributes: IndexMap::new(),
            relationships: RwLock::new(IndexMap::new()),
            meta: None,
        }
    }

    /// Sets an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Sets resource-level metadata.
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Declares an empty to-one relationship.
    pub fn has_one(self, name: impl Into<String>) -> Self {
        self.relationships
            .write()
            .insert(name.into(), Related::One(None));
        self
    }

    /// Declares an empty to-many relationship.
    pub fn has_many(self, name: impl Into<String>) -> Self {
        self.relationships
            .write()
            .insert(name.into(), Related::Many(Vec::new()));
        self
    }

    /// Moves the record into a shared handle.
    #[must_use]
    pub fn into_ref(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Sets the target of a to-one relationship, declaring it if needed.
    pub fn set_one(&self, name: impl Into<String>, record: Option<RecordRef>) {
        self.relationships
            .write()
            .insert(name.into(), Related::One(record));
    }

    /// Sets the targets of a to-many relationship, declaring it if needed.
    pub fn set_many(&self, name: impl Into<String>, records: Vec<RecordRef>) {
        self.relationships
            .write()
            .insert(name.into(), Related::Many(records));
    }
}

impl fmt::Debug for MemoryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let relationships: Vec<String> = self.relationships.read().keys().cloned().collect();
        f.debug_struct("MemoryRecord")
            .field("resource_type", &self.resource_type)
            .field("id", &self.id)
            .field("attributes", &self.attributes)
            .field("relationships", &relationships)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Record for MemoryRecord {
    fn resource_type(&self) -> &str {
        &self.resource_type
    }

    fn id(&self) -> Value {
        self.id.clone()
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        self.attributes.get(name).cloned()
    }

    fn relationship_kind(&self, name: &str) -> Option<RelationshipKind> {
        self.relationships.read().get(name).map(Related::kind)
    }

    async fn related(&self, name: &str) -> TrellisResult<Related> {
        self.relationships.read().get(name).cloned().ok_or_else(|| {
            TrellisError::configuration(format!(
                "{} does not define a `{name}` relationship",
                self.resource_type
            ))
        })
    }

    fn meta(&self) -> Option<Value> {
        self.meta.clone()
    }
}
