//! The domain record contract consumed by serializers.
//!
//! Persistence is outside Trellis. Anything that can report a resource type,
//! an id, attribute values and related records can be rendered, whether it is
//! backed by an ORM, a remote service or an in-memory map.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TrellisResult;

/// Shared handle to a record.
pub type RecordRef = Arc<dyn Record>;

/// Cardinality of a relationship declared on a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipKind {
    /// At most one related record.
    HasOne,
    /// Any number of related records.
    HasMany,
}

/// The records on the other side of a relationship.
#[derive(Debug, Clone)]
pub enum Related {
    /// A to-one relationship, possibly empty.
    One(Option<RecordRef>),
    /// A to-many relationship.
    Many(Vec<RecordRef>),
}

impl Related {
    /// Returns the relationship's cardinality.
    #[must_use]
    pub const fn kind(&self) -> RelationshipKind {
        match self {
            Self::One(_) => RelationshipKind::HasOne,
            Self::Many(_) => RelationshipKind::HasMany,
        }
    }

    /// Iterates the related records.
    pub fn records(&self) -> impl Iterator<Item = &RecordRef> {
        let (one, many) = match self {
            Self::One(record) => (record.as_ref(), [].as_slice()),
            Self::Many(records) => (None, records.as_slice()),
        };
        one.into_iter().chain(many)
    }

    /// Returns the empty value for a cardinality.
    #[must_use]
    pub const fn empty(kind: RelationshipKind) -> Self {
        match kind {
            RelationshipKind::HasOne => Self::One(None),
            RelationshipKind::HasMany => Self::Many(Vec::new()),
        }
    }
}

/// A domain object that can be serialized.
///
/// `resource_type` is the singular type tag (`"post"`, `"blog-post"`) used to
/// find the record's serializer (`serializer:{type}`).
#[async_trait]
pub trait Record: Send + Sync + fmt::Debug {
    /// Singular type tag.
    fn resource_type(&self) -> &str;

    /// The record's id.
    fn id(&self) -> Value;

    /// Reads an attribute. `None` means the record has no such attribute.
    fn attribute(&self, name: &str) -> Option<Value>;

    /// Declared cardinality of a relationship, or `None` if the record type
    /// does not define it.
    fn relationship_kind(&self, name: &str) -> Option<RelationshipKind>;

    /// Loads the related records. May suspend on I/O.
    async fn related(&self, name: &str) -> TrellisResult<Related>;

    /// Resource-level metadata.
    fn meta(&self) -> Option<Value> {
        None
    }
}

/// Formats an id value the way wire formats expect: strings verbatim,
/// anything else through its JSON representation.
#[must_use]
pub fn id_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
