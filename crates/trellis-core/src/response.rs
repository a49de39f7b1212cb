//! The outbound side of the transport boundary.

use bytes::Bytes;
use http::header::{HeaderValue, IntoHeaderName};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;

/// An outbound response sink.
///
/// Status and headers may be changed until [`end`](Self::end) is called;
/// after that the response is finished and further writes are ignored.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Bytes>,
    finished: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// Creates an empty `200 OK` response.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: None,
            finished: false,
        }
    }

    /// Returns the status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the status code.
    pub fn set_status(&mut self, status: StatusCode) {
        if !self.finished {
            self.status = status;
        }
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

    /// Sets a header, replacing any previous value.
    pub fn set_header<K: IntoHeaderName>(&mut self, name: K, value: HeaderValue) {
        if !self.finished {
            self.headers.insert(name, value);
        }
    }

    /// Returns the body written so far.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Parses the body as JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(self.body.as_deref().unwrap_or_default())
    }

    /// Writes the body and finishes the response.
    pub fn send(&mut self, body: impl Into<Bytes>) {
        if !self.finished {
            self.body = Some(body.into());
            self.finished = true;
        }
    }

    /// Finishes the response without a body.
    pub fn end(&mut self) {
        self.finished = true;
    }

    /// Returns `true` once the response has been finished.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Converts into an `http` response.
    #[must_use]
    pub fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut response = http::Response::new(Full::new(self.body.unwrap_or_default()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
