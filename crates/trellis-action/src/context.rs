//! Per-request state handed to actions, and rendering.

use std::fmt;
use std::sync::Arc;

use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use serde_json::Value;
use trellis_core::{Container, Payload, Request, Response, TrellisError, TrellisResult, REQUEST_ID_HEADER};
use trellis_serializer::{RenderOptions, SerializeContext, APPLICATION_SERIALIZER};

use crate::registry::ActionRegistry;

/// Where an action is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, nothing has run.
    Created,
    /// Running the parser.
    Parsing,
    /// Running before-filters.
    BeforeFilters,
    /// Running the responder.
    Responding,
    /// Running after-filters.
    AfterFilters,
    /// Finished with a rendered response.
    Rendered,
    /// Finished with an error.
    Error,
}

impl Phase {
    /// Returns `true` for `Rendered` and `Error`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rendered | Self::Error)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Parsing => "parsing",
            Self::BeforeFilters => "before_filters",
            Self::Responding => "responding",
            Self::AfterFilters => "after_filters",
            Self::Rendered => "rendered",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Application-wide defaults an action falls back on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDefaults {
    /// Serializer used when neither the render call nor the payload type picks one.
    pub serializer: String,
    /// Parser used by actions with [`ParserChoice::Application`](crate::ParserChoice).
    pub parser: String,
    /// Render internal error messages verbatim instead of a generic one.
    pub expose_error_details: bool,
}

impl Default for ActionDefaults {
    fn default() -> Self {
        Self {
            serializer: APPLICATION_SERIALIZER.to_string(),
            parser: APPLICATION_SERIALIZER.to_string(),
            expose_error_details: false,
        }
    }
}

/// Everything an action sees while handling one request.
///
/// The context owns the request and the response under construction. It
/// tracks whether something has been rendered: only the first
/// [`render`](Self::render) call has an effect.
pub struct ActionContext {
    action: String,
    request: Request,
    response: Response,
    container: Arc<Container>,
    defaults: Arc<ActionDefaults>,
    params: Value,
    phase: Phase,
    rendered: bool,
}

impl fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionContext")
            .field("action", &self.action)
            .field("request_id", &self.request.id())
            .field("phase", &self.phase)
            .field("rendered", &self.rendered)
            .finish_non_exhaustive()
    }
}

impl ActionContext {
    /// Creates a context. The response starts out carrying the request's
    /// correlation id.
    #[must_use]
    pub fn new(
        action: impl Into<String>,
        request: Request,
        container: Arc<Container>,
        defaults: Arc<ActionDefaults>,
    ) -> Self {
        let mut response = Response::new();
        if let Ok(value) = HeaderValue::from_str(&request.id().to_string()) {
            response.set_header(REQUEST_ID_HEADER, value);
        }
        Self {
            action: action.into(),
            request,
            response,
            container,
            defaults,
            params: Value::Null,
            phase: Phase::Created,
            rendered: false,
        }
    }

    /// Returns the name the action was resolved under.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Returns the request.
    #[must_use]
    pub const fn request(&self) -> &Request {
        &self.request
    }

    /// Returns the response built so far.
    #[must_use]
    pub const fn response(&self) -> &Response {
        &self.response
    }

    /// Returns the response for direct writes.
    ///
    /// Writing a body this way does not count as rendering.
    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Returns the container.
    #[must_use]
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Resolves a typed service from the container.
    pub fn service<T: Send + Sync + 'static>(&self) -> TrellisResult<Arc<T>> {
        Ok(self.container.resolve_required::<T>()?)
    }

    /// Returns the application defaults.
    #[must_use]
    pub fn defaults(&self) -> &ActionDefaults {
        &self.defaults
    }

    /// Returns the parsed params (`null` before parsing).
    #[must_use]
    pub const fn params(&self) -> &Value {
        &self.params
    }

    pub(crate) fn set_params(&mut self, params: Value) {
        self.params = params;
    }

    /// Returns the lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn enter(&mut self, phase: Phase) {
        tracing::trace!(action = %self.action, from = %self.phase, to = %phase, "action phase");
        self.phase = phase;
    }

    /// Returns `true` once [`render`](Self::render) has been called.
    #[must_use]
    pub const fn is_rendered(&self) -> bool {
        self.rendered
    }

    /// Renders a response.
    ///
    /// Only the first call has an effect. Without a payload the response is
    /// finished with no body. With [`RenderOptions::view`] set, the view
    /// registered under `view:{name}` writes the response. Otherwise one
    /// serializer is chosen: the one named in the options, else the one
    /// registered for the payload's record type, else the application
    /// default.
    pub async fn render(
        &mut self,
        status: StatusCode,
        payload: Option<Payload>,
        options: RenderOptions,
    ) -> TrellisResult<()> {
        if self.rendered {
            tracing::warn!(
                action = %self.action,
                status = status.as_u16(),
                "render called more than once; ignoring"
            );
            return Ok(());
        }
        self.rendered = true;
        self.response.set_status(status);

        let Some(payload) = payload else {
            self.response.end();
            return Ok(());
        };

        if let Some(name) = options.view.as_deref() {
            let view = self.container.view(name)?;
            return view
                .render(&self.request, &mut self.response, &payload, &options)
                .await;
        }

        let cx = SerializeContext::new(&self.container)
            .with_request(&self.request)
            .with_default_serializer(&self.defaults.serializer);
        let serializer = match (options.serializer.as_deref(), payload.resource_type()) {
            (Some(name), _) => cx.serializer_for("", Some(name))?,
            (None, Some(resource_type)) => cx.serializer_for(resource_type, None)?,
            (None, None) => cx.fallback_serializer()?,
        };

        let document = serializer.serialize(&payload, &cx, &options).await?;
        let body = serde_json::to_vec(&document)
            .map_err(|e| TrellisError::internal_with_source("failed to encode response body", e))?;

        self.response
            .set_header(CONTENT_TYPE, HeaderValue::from_static(serializer.content_type()));
        self.response.send(body);
        tracing::debug!(
            action = %self.action,
            status = status.as_u16(),
            content_type = serializer.content_type(),
            "rendered"
        );
        Ok(())
    }

    /// Renders `payload` with `200 OK` and default options.
    pub async fn render_ok(&mut self, payload: impl Into<Payload> + Send) -> TrellisResult<()> {
        self.render(StatusCode::OK, Some(payload.into()), RenderOptions::default())
            .await
    }

    /// Splits the context into its request and response.
    #[must_use]
    pub fn into_parts(self) -> (Request, Response) {
        (self.request, self.response)
    }

    #[cfg(test)]
    pub(crate) fn for_test() -> Self {
        Self::new(
            "test",
            Request::new(http::Method::GET, "/"),
            Arc::new(Container::new()),
            Arc::new(ActionDefaults::default()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use trellis_core::fixtures::MemoryRecord;
    use trellis_core::ErrorCategory;
    use trellis_serializer::{FlatSerializer, JsonApiSerializer, Schema, SerializerRegistry, JSON_API_CONTENT_TYPE};

    use crate::view::View;

    struct Plain;

    #[async_trait]
    impl View for Plain {
        async fn render(
            &self,
            _request: &Request,
            response: &mut Response,
            payload: &Payload,
            _options: &RenderOptions,
        ) -> TrellisResult<()> {
            let Payload::Value(value) = payload else {
                return Err(TrellisError::internal("plain view renders values only"));
            };
            response.set_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
            response.send(value.as_str().unwrap_or_default().to_string());
            Ok(())
        }
    }

    fn context(container: Container) -> ActionContext {
        ActionContext::new(
            "books/show",
            Request::new(http::Method::GET, "/books/1"),
            Arc::new(container),
            Arc::new(ActionDefaults::default()),
        )
    }

    fn container() -> Container {
        let mut container = Container::new();
        container.register_serializer("application", FlatSerializer::default());
        container.register_serializer(
            "book",
            JsonApiSerializer::new(Schema::new().attributes(["title"])),
        );
        container.register_serializer(
            "summary",
            FlatSerializer::new(Schema::new().attributes(["title"])),
        );
        container.register_view("plain", Plain);
        container
    }

    fn book() -> Payload {
        Payload::record(
            MemoryRecord::new("book", 1)
                .with_attribute("title", "Dune")
                .into_ref(),
        )
    }

    #[test]
    fn test_response_carries_request_id() {
        let cx = context(Container::new());
        let id = cx.request().id().to_string();
        assert_eq!(cx.response().header(REQUEST_ID_HEADER), Some(id.as_str()));
    }

    #[tokio::test]
    async fn test_render_uses_type_serializer() {
        let mut cx = context(container());
        cx.render(StatusCode::OK, Some(book()), RenderOptions::new())
            .await
            .unwrap();

        let response = cx.response();
        assert_eq!(response.header("content-type"), Some(JSON_API_CONTENT_TYPE));
        assert_eq!(response.json().unwrap()["data"]["type"], "books");
    }

    #[tokio::test]
    async fn test_explicit_serializer_wins() {
        let mut cx = context(container());
        cx.render(
            StatusCode::CREATED,
            Some(book()),
            RenderOptions::new().serializer("summary"),
        )
        .await
        .unwrap();

        assert_eq!(cx.response().status(), StatusCode::CREATED);
        assert_eq!(cx.response().json().unwrap(), json!({"id": 1, "title": "Dune"}));
    }

    #[tokio::test]
    async fn test_values_fall_back_to_default_serializer() {
        let mut cx = context(container());
        cx.render_ok(json!({"ok": true})).await.unwrap();
        assert_eq!(cx.response().json().unwrap(), json!({"ok": true}));
        assert_eq!(cx.response().header("content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn test_second_render_is_ignored() {
        let mut cx = context(container());
        cx.render(StatusCode::ACCEPTED, None, RenderOptions::new())
            .await
            .unwrap();
        cx.render_ok(json!({"late": true})).await.unwrap();

        assert!(cx.is_rendered());
        assert_eq!(cx.response().status(), StatusCode::ACCEPTED);
        assert!(cx.response().body().is_none());
        assert!(cx.response().is_finished());
    }

    #[tokio::test]
    async fn test_view_bypasses_serializers() {
        let mut cx = context(container());
        cx.render(
            StatusCode::OK,
            Some(Payload::from(json!("hello"))),
            RenderOptions::new().view("plain"),
        )
        .await
        .unwrap();

        assert_eq!(cx.response().header("content-type"), Some("text/plain"));
        assert_eq!(cx.response().body().unwrap().as_ref(), b"hello");
    }

    #[tokio::test]
    async fn test_unknown_view_is_configuration_error() {
        let mut cx = context(container());
        let err = cx
            .render(
                StatusCode::OK,
                Some(Payload::from(json!("hello"))),
                RenderOptions::new().view("missing"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }
}
