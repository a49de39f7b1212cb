//! Request parsers.
//!
//! A parser turns a [`Request`] into a format-agnostic params object:
//!
//! ```json
//! { "params": { ...route params }, "query": { ... }, "body": ... }
//! ```
//!
//! The JSON-API parser adds a top-level `included` array when the request
//! document sideloads resources.

use std::sync::Arc;

use async_trait::async_trait;
use heck::ToLowerCamelCase;
use serde_json::{Map, Value};
use trellis_core::{Request, TrellisError, TrellisResult};

/// Shared handle to a parser, as stored in the container.
pub type ParserRef = Arc<dyn Parser>;

/// Turns a request into params.
#[async_trait]
pub trait Parser: Send + Sync {
    /// Parses the request.
    async fn parse(&self, request: &Request) -> TrellisResult<Value>;
}

fn envelope(request: &Request) -> Map<String, Value> {
    let params = request
        .params()
        .iter()
        .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
        .collect();
    let query = request
        .query()
        .iter()
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect();

    let mut parsed = Map::new();
    parsed.insert("params".to_string(), Value::Object(params));
    parsed.insert("query".to_string(), Value::Object(query));
    parsed
}

fn decode_body(request: &Request) -> TrellisResult<Value> {
    if request.body().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(request.body())
        .map_err(|e| TrellisError::validation(format!("request body is not valid JSON: {e}")))
}

/// Passes a JSON body through unchanged under `body`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

#[async_trait]
impl Parser for JsonParser {
    async fn parse(&self, request: &Request) -> TrellisResult<Value> {
        let mut parsed = envelope(request);
        parsed.insert("body".to_string(), decode_body(request)?);
        Ok(Value::Object(parsed))
    }
}

/// Flattens JSON-API request documents.
///
/// Each resource object becomes `{ id, type, ...attributes, ...relationships }`
/// with attribute and relationship names camel-cased and relationships
/// reduced to their linkage.
///
/// # Example
///
/// ```
/// # tokio_test::block_on(async {
/// use http::Method;
/// use serde_json::json;
/// use trellis_action::{JsonApiParser, Parser};
/// use trellis_core::Request;
///
/// let request = Request::new(Method::POST, "/books").with_json(
///     "application/vnd.api+json",
///     &json!({"data": {"type": "books", "attributes": {"published-at": "2020"}}}),
/// );
/// let parsed = JsonApiParser.parse(&request).await.unwrap();
/// assert_eq!(parsed["body"], json!({"type": "books", "publishedAt": "2020"}));
/// # });
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonApiParser;

impl JsonApiParser {
    fn resource(value: &Value) -> TrellisResult<Value> {
        let Value::Object(resource) = value else {
            return Err(TrellisError::validation(
                "JSON-API resource objects must be JSON objects",
            ));
        };

        let mut flat = Map::new();
        for member in ["id", "type"] {
            if let Some(value) = resource.get(member) {
                flat.insert(member.to_string(), value.clone());
            }
        }
        if let Some(Value::Object(attributes)) = resource.get("attributes") {
            for (name, value) in attributes {
                flat.insert(name.to_lower_camel_case(), value.clone());
            }
        }
        if let Some(Value::Object(relationships)) = resource.get("relationships") {
            for (name, relationship) in relationships {
                let linkage = relationship.get("data").cloned().unwrap_or(Value::Null);
                flat.insert(name.to_lower_camel_case(), linkage);
            }
        }
        Ok(Value::Object(flat))
    }

    fn primary(data: &Value) -> TrellisResult<Value> {
        match data {
            Value::Null => Ok(Value::Null),
            Value::Array(resources) => resources
                .iter()
                .map(Self::resource)
                .collect::<TrellisResult<Vec<_>>>()
                .map(Value::Array),
            resource => Self::resource(resource),
        }
    }
}

#[async_trait]
impl Parser for JsonApiParser {
    async fn parse(&self, request: &Request) -> TrellisResult<Value> {
        let mut parsed = envelope(request);
        let document = decode_body(request)?;

        let body = match document.get("data") {
            Some(data) => Self::primary(data)?,
            None if document.is_null() => Value::Null,
            None => {
                return Err(TrellisError::validation(
                    "JSON-API request documents must contain a `data` member",
                ))
            }
        };
        parsed.insert("body".to_string(), body);

        if let Some(Value::Array(included)) = document.get("included") {
            let included = included
                .iter()
                .map(Self::resource)
                .collect::<TrellisResult<Vec<_>>>()?;
            parsed.insert("included".to_string(), Value::Array(included));
        }
        Ok(Value::Object(parsed))
    }
}
