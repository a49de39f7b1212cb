//! Serializer input.
//!
//! A [`Payload`] is what an action hands to `render`: one record, a list of
//! records, an error, or a raw JSON value. Lists are stored item by item so
//! that a list mixing records and errors can be represented and rejected at
//! serialization time.

use std::sync::Arc;

use serde_json::Value;

use crate::error::{TrellisError, TrellisResult};
use crate::model::{Record, RecordRef};

/// One element of a [`Payload::List`].
#[derive(Debug, Clone)]
pub enum PayloadItem {
    /// A domain record.
    Record(RecordRef),
    /// An error.
    Error(Arc<TrellisError>),
}

/// A response body awaiting serialization.
#[derive(Debug, Clone)]
pub enum Payload {
    /// A single record.
    Record(RecordRef),
    /// A list of records or errors. Must be homogeneous to serialize.
    List(Vec<PayloadItem>),
    /// A single error.
    Error(Arc<TrellisError>),
    /// A plain JSON value that is not a domain record.
    Value(Value),
}

/// A validated view of a payload.
#[derive(Debug)]
pub enum Shape<'a> {
    /// A single record.
    Record(&'a RecordRef),
    /// Zero or more records.
    Records(Vec<&'a RecordRef>),
    /// A single error.
    Error(&'a TrellisError),
    /// One or more errors.
    Errors(Vec<&'a TrellisError>),
    /// A raw JSON value.
    Value(&'a Value),
}

impl Payload {
    /// Wraps a single record.
    pub fn record<R: Record + 'static>(record: Arc<R>) -> Self {
        Self::Record(record)
    }

    /// Wraps a list of records.
    pub fn records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = RecordRef>,
    {
        Self::List(records.into_iter().map(PayloadItem::Record).collect())
    }

    /// Wraps an error.
    #[must_use]
    pub fn error(error: TrellisError) -> Self {
        Self::Error(Arc::new(error))
    }

    /// Returns the resource type used for serializer selection: the type of a
    /// single record, or of the first record of a non-empty list.
    #[must_use]
    pub fn resource_type(&self) -> Option<&str> {
        match self {
            Self::Record(record) => Some(record.resource_type()),
            Self::List(items) => match items.first() {
                Some(PayloadItem::Record(record)) => Some(record.resource_type()),
                _ => None,
            },
            Self::Error(_) | Self::Value(_) => None,
        }
    }

    /// Returns `true` if the payload is, or starts with, an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        match self {
            Self::Error(_) => true,
            Self::List(items) => matches!(items.first(), Some(PayloadItem::Error(_))),
            Self::Record(_) | Self::Value(_) => false,
        }
    }

    /// Validates the payload and returns its shape.
    ///
    /// A list that contains both records and errors is a configuration error.
    pub fn shape(&self) -> TrellisResult<Shape<'_>> {
        match self {
            Self::Record(record) => Ok(Shape::Record(record)),
            Self::Error(error) => Ok(Shape::Error(error)),
            Self::Value(value) => Ok(Shape::Value(value)),
            Self::List(items) => {
                if matches!(items.first(), Some(PayloadItem::Error(_))) {
                    items
                        .iter()
                        .map(|item| match item {
                            PayloadItem::Error(error) => Ok(error.as_ref()),
                            PayloadItem::Record(_) => Err(mixed_payload()),
                        })
                        .collect::<TrellisResult<Vec<_>>>()
                        .map(Shape::Errors)
                } else {
                    items
                        .iter()
                        .map(|item| match item {
                            PayloadItem::Record(record) => Ok(record),
                            PayloadItem::Error(_) => Err(mixed_payload()),
                        })
                        .collect::<TrellisResult<Vec<_>>>()
                        .map(Shape::Records)
                }
            }
        }
    }
}

fn mixed_payload() -> TrellisError {
    TrellisError::configuration("cannot serialize a list mixing records and errors")
}

impl From<RecordRef> for Payload {
    fn from(record: RecordRef) -> Self {
        Self::Record(record)
    }
}

impl From<Vec<RecordRef>> for Payload {
    fn from(records: Vec<RecordRef>) -> Self {
        Self::records(records)
    }
}

impl From<TrellisError> for Payload {
    fn from(error: TrellisError) -> Self {
        Self::error(error)
    }
}

impl From<Arc<TrellisError>> for Payload {
    fn from(error: Arc<TrellisError>) -> Self {
        Self::Error(error)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::MemoryRecord;

    fn post(id: i64) -> RecordRef {
        Arc::new(MemoryRecord::new("post", id))
    }

    #[test]
    fn test_resource_type_of_list_uses_first_record() {
        let payload = Payload::records(vec![post(1), post(2)]);
        assert_eq!(payload.resource_type(), Some("post"));
        assert_eq!(Payload::records(Vec::new()).resource_type(), None);
    }

    #[test]
    fn test_shape_of_homogeneous_lists() {
        let records = Payload::records(vec![post(1), post(2)]);
        assert!(matches!(records.shape().unwrap(), Shape::Records(r) if r.len() == 2));

        let errors = Payload::List(vec![
            PayloadItem::Error(Arc::new(TrellisError::validation("a"))),
            PayloadItem::Error(Arc::new(TrellisError::validation("b"))),
        ]);
        assert!(errors.is_error());
        assert!(matches!(errors.shape().unwrap(), Shape::Errors(e) if e.len() == 2));
    }

    #[test]
    fn test_mixed_list_is_rejected() {
        let mixed = Payload::List(vec![
            PayloadItem::Record(post(1)),
            PayloadItem::Error(Arc::new(TrellisError::validation("bad"))),
        ]);
        let err = mixed.shape().unwrap_err();
        assert_eq!(err.category(), crate::ErrorCategory::Configuration);

        let mixed = Payload::List(vec![
            PayloadItem::Error(Arc::new(TrellisError::validation("bad"))),
            PayloadItem::Record(post(1)),
        ]);
        assert!(mixed.shape().is_err());
    }

    #[test]
    fn test_value_payload_has_no_type() {
        let payload = Payload::from(serde_json::json!({"ok": true}));
        assert_eq!(payload.resource_type(), None);
        assert!(!payload.is_error());
    }
}
