//! The JSON-API top-level document.

use indexmap::IndexSet;
use serde::Serialize;
use serde_json::Value;
use trellis_core::{TrellisError, TrellisResult};

/// JSON-API version stamped on every document.
pub const JSON_API_VERSION: &str = "1.0";

/// A JSON-API top-level document under construction.
///
/// `data` and `errors` are mutually exclusive: setting one after the other
/// is an error. `included` may hold duplicates until
/// [`dedupe_included`](Self::dedupe_included) runs.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use trellis_serializer::Document;
///
/// let mut document = Document::new();
/// document.set_data(json!({"type": "posts", "id": "1"})).unwrap();
/// assert!(document.set_errors(vec![json!({"status": "500"})]).is_err());
///
/// document.push_included(json!({"type": "comments", "id": "9"}));
/// document.push_included(json!({"type": "comments", "id": "9"}));
/// document.dedupe_included();
/// assert_eq!(document.included().len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Document {
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    links: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    jsonapi: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    included: Vec<Value>,
}

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets primary data.
    pub fn set_data(&mut self, data: Value) -> TrellisResult<()> {
        if self.errors.is_some() {
            return Err(TrellisError::configuration(
                "a JSON-API document cannot carry both data and errors",
            ));
        }
        self.data = Some(data);
        Ok(())
    }

    /// Sets the error objects.
    pub fn set_errors(&mut self, errors: Vec<Value>) -> TrellisResult<()> {
        if self.data.is_some() {
            return Err(TrellisError::configuration(
                "a JSON-API document cannot carry both data and errors",
            ));
        }
        self.errors = Some(errors);
        Ok(())
    }

    /// Returns primary data.
    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Returns the error objects.
    #[must_use]
    pub fn errors(&self) -> Option<&[Value]> {
        self.errors.as_deref()
    }

    /// Sets top-level metadata.
    pub fn set_meta(&mut self, meta: Value) {
        self.meta = Some(meta);
    }

    /// Sets top-level links.
    pub fn set_links(&mut self, links: Value) {
        self.links = Some(links);
    }

    /// Stamps the `jsonapi` member.
    pub fn stamp_version(&mut self) {
        self.jsonapi = Some(serde_json::json!({ "version": JSON_API_VERSION }));
    }

    /// Appends sideloaded resources.
    pub fn push_included(&mut self, resource: Value) {
        self.included.push(resource);
    }

    /// Returns the sideloaded resources.
    #[must_use]
    pub fn included(&self) -> &[Value] {
        &self.included
    }

    /// Keeps the first resource for each `(type, id)` pair.
    pub fn dedupe_included(&mut self) {
        let mut seen = IndexSet::new();
        self.included.retain(|resource| {
            let key = (
                resource.get("type").and_then(Value::as_str).map(str::to_owned),
                resource.get("id").and_then(Value::as_str).map(str::to_owned),
            );
            seen.insert(key)
        });
    }

    /// Converts into JSON.
    pub fn into_value(self) -> TrellisResult<Value> {
        serde_json::to_value(self)
            .map_err(|e| TrellisError::internal_with_source("failed to encode document", e))
    }
}
