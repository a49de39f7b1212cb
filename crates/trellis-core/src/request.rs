//! The inbound side of the transport boundary.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method};
use indexmap::IndexMap;
use trellis_router::Params;

use crate::context::{RequestId, REQUEST_ID_HEADER};
use crate::error::TrellisError;

/// The route a request was matched against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRoute {
    /// Method the route is registered under.
    pub method: Method,
    /// Normalized pattern source.
    pub pattern: String,
    /// Action name the route dispatches to.
    pub action: String,
}

/// An inbound request.
///
/// `params` and `route` are filled in by the router once a route matches;
/// `error` is set before the error action runs.
///
/// # Example
///
/// ```
/// use http::Method;
/// use trellis_core::Request;
///
/// let request = Request::new(Method::GET, "/books?page=2&q=rust%20lang");
/// assert_eq!(request.path(), "/books");
/// assert_eq!(request.query_param("page"), Some("2"));
/// assert_eq!(request.query_param("q"), Some("rust lang"));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    id: RequestId,
    method: Method,
    path: String,
    query: IndexMap<String, String>,
    headers: HeaderMap,
    body: Bytes,
    params: Params,
    route: Option<MatchedRoute>,
    error: Option<Arc<TrellisError>>,
}

impl Request {
    /// Creates a request from a method and a path with optional query string.
    #[must_use]
    pub fn new(method: Method, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (uri, IndexMap::new()),
        };
        Self {
            id: RequestId::new(),
            method,
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: Params::new(),
            route: None,
            error: None,
        }
    }

    /// Wraps a raw `http` request.
    ///
    /// A valid UUID in an incoming `x-request-id` header is kept as the
    /// correlation id; otherwise a fresh one is generated.
    #[must_use]
    pub fn from_http(request: http::Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        let uri = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_string(), ToString::to_string);
        let mut wrapped = Self::new(parts.method, &uri);
        if let Some(id) = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(RequestId::parse)
        {
            wrapped.id = id;
        }
        wrapped.headers = parts.headers;
        wrapped.body = body;
        wrapped
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the raw body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body with the given content type.
    #[must_use]
    pub fn with_json(mut self, content_type: &'static str, body: &serde_json::Value) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.body = Bytes::from(body.to_string());
        self
    }

    /// Returns the correlation id.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// Returns the HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the path, without query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the decoded query parameters.
    #[must_use]
    pub const fn query(&self) -> &IndexMap<String, String> {
        &self.query
    }

    /// Returns one query parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Returns the headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value if it is valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the media type of the body, without parameters.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE.as_str())
            .map(|value| value.split(';').next().unwrap_or(value).trim())
    }

    /// Returns the raw body.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the route parameters.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// Returns the matched route, once routing has happened.
    #[must_use]
    pub const fn route(&self) -> Option<&MatchedRoute> {
        self.route.as_ref()
    }

    /// Returns the error being handled, inside the error action.
    #[must_use]
    pub fn error(&self) -> Option<&Arc<TrellisError>> {
        self.error.as_ref()
    }

    /// Binds the matched route and its parameters.
    pub fn bind_route(&mut self, route: MatchedRoute, params: Params) {
        self.route = Some(route);
        self.params = params;
    }

    /// Attaches the error the error action should render.
    pub fn set_error(&mut self, error: Arc<TrellisError>) {
        self.error = Some(error);
    }
}

fn parse_query(query: &str) -> IndexMap<String, String> {
    match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
        Ok(pairs) => pairs.into_iter().collect(),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring malformed query string");
            IndexMap::new()
        }
    }
}
