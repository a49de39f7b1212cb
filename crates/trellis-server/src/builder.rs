//! Route registration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::Method;
use trellis_action::{
    ActionDefaults, ActionFactoryRef, ActionRegistry, ErrorAction, JsonApiParser, JsonParser,
    ERROR_ACTION,
};
use trellis_config::TrellisConfig;
use trellis_core::{Container, Params, TrellisError, TrellisResult};
use trellis_router::{expand, ResourceOptions, Route, RoutePattern, RouteTable};
use trellis_serializer::{FlatSerializer, JsonApiSerializer, SerializerRegistry};
use trellis_telemetry::metrics::describe_metrics;

use crate::middleware::{Middleware, MiddlewareRef};
use crate::router::Router;

/// The route registration DSL shared by [`RouterBuilder`] and [`Namespace`].
///
/// Every verb method resolves its action immediately: naming an action that
/// is not registered in the container is a configuration error.
pub trait RouteDsl {
    /// Registers a route carrying static parameters.
    fn route_with(
        &mut self,
        method: Method,
        pattern: &str,
        action: &str,
        static_params: Params,
    ) -> TrellisResult<&mut Self>;

    /// Registers a route.
    fn route(&mut self, method: Method, pattern: &str, action: &str) -> TrellisResult<&mut Self> {
        self.route_with(method, pattern, action, Params::new())
    }

    /// Registers a `GET` route.
    fn get(&mut self, pattern: &str, action: &str) -> TrellisResult<&mut Self> {
        self.route(Method::GET, pattern, action)
    }

    /// Registers a `POST` route.
    fn post(&mut self, pattern: &str, action: &str) -> TrellisResult<&mut Self> {
        self.route(Method::POST, pattern, action)
    }

    /// Registers a `PUT` route.
    fn put(&mut self, pattern: &str, action: &str) -> TrellisResult<&mut Self> {
        self.route(Method::PUT, pattern, action)
    }

    /// Registers a `PATCH` route.
    fn patch(&mut self, pattern: &str, action: &str) -> TrellisResult<&mut Self> {
        self.route(Method::PATCH, pattern, action)
    }

    /// Registers a `DELETE` route.
    fn delete(&mut self, pattern: &str, action: &str) -> TrellisResult<&mut Self> {
        self.route(Method::DELETE, pattern, action)
    }

    /// Registers a `HEAD` route.
    fn head(&mut self, pattern: &str, action: &str) -> TrellisResult<&mut Self> {
        self.route(Method::HEAD, pattern, action)
    }

    /// Registers an `OPTIONS` route.
    fn options(&mut self, pattern: &str, action: &str) -> TrellisResult<&mut Self> {
        self.route(Method::OPTIONS, pattern, action)
    }

    /// Registers the conventional routes of a resource.
    ///
    /// Actions are named `{name}/{kind}`, e.g. `books/list`, and all of them
    /// must be registered.
    fn resource(&mut self, name: &str, options: &ResourceOptions) -> TrellisResult<&mut Self> {
        for route in expand(name, options) {
            self.route(route.method, &route.pattern, &route.action)?;
        }
        Ok(self)
    }
}

/// Builds a [`Router`].
///
/// Actions, parsers, serializers and views are registered in the container
/// first; routes then bind to them by name.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use trellis_action::{Action, ActionContext, ActionRegistry};
/// use trellis_core::{Container, Payload, TrellisResult};
/// use trellis_server::{RouteDsl, RouterBuilder};
///
/// #[derive(Default)]
/// struct Health;
///
/// #[async_trait]
/// impl Action for Health {
///     async fn respond(&mut self, _cx: &mut ActionContext) -> TrellisResult<Option<Payload>> {
///         Ok(Some(Payload::from(serde_json::json!({"ok": true}))))
///     }
/// }
///
/// let mut container = Container::new();
/// container.register_action::<Health>("health");
///
/// let mut builder = RouterBuilder::new(container).with_standard_components();
/// builder.get("/health", "health").unwrap();
/// builder
///     .namespace("/admin", |admin| {
///         admin.get("/health", "health")?;
///         Ok(())
///     })
///     .unwrap();
///
/// let router = builder.build().unwrap();
/// assert_eq!(router.routes().len(), 2);
/// assert_eq!(router.url_for("health", &Default::default()).as_deref(), Some("/health"));
/// ```
pub struct RouterBuilder {
    container: Container,
    routes: RouteTable<ActionFactoryRef>,
    middleware: Vec<MiddlewareRef>,
    defaults: ActionDefaults,
    dasherize: bool,
    timeout: Option<Duration>,
}

impl fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder")
            .field("routes", &self.routes.len())
            .field("middleware", &self.middleware.len())
            .field("defaults", &self.defaults)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RouterBuilder {
    /// Creates a builder over a container.
    #[must_use]
    pub fn new(container: Container) -> Self {
        Self {
            container,
            routes: RouteTable::new(),
            middleware: Vec::new(),
            defaults: ActionDefaults::default(),
            dasherize: true,
            timeout: None,
        }
    }

    /// Applies the server and serialization sections of a configuration.
    #[must_use]
    pub fn configure(mut self, config: &TrellisConfig) -> Self {
        self.defaults = ActionDefaults {
            serializer: config.serialization.default_serializer.clone(),
            parser: config.serialization.default_parser.clone(),
            expose_error_details: config.server.expose_error_details,
        };
        self.dasherize = config.serialization.dasherize;
        self.timeout = config.server.request_timeout();
        self
    }

    /// Registers the built-in parsers, serializers and error action under any
    /// name that is still free:
    ///
    /// - parsers `json`, `json-api`, and `application` (plain JSON)
    /// - serializers `flat`, `json-api`, and `application` (JSON-API)
    /// - the action `error`
    ///
    /// Call after [`configure`](Self::configure) so the dasherize setting
    /// applies.
    #[must_use]
    pub fn with_standard_components(mut self) -> Self {
        let container = &mut self.container;
        if !container.has("parser:json") {
            container.register_parser("json", JsonParser);
        }
        if !container.has("parser:json-api") {
            container.register_parser("json-api", JsonApiParser);
        }
        if !container.has("parser:application") {
            container.register_parser("application", JsonParser);
        }
        if !container.has("serializer:flat") {
            container.register_serializer("flat", FlatSerializer::default());
        }
        if !container.has("serializer:json-api") {
            container.register_serializer(
                "json-api",
                JsonApiSerializer::default().dasherize(self.dasherize),
            );
        }
        if !container.has("serializer:application") {
            container.register_serializer(
                "application",
                JsonApiSerializer::default().dasherize(self.dasherize),
            );
        }
        if !container.has(&format!("action:{ERROR_ACTION}")) {
            container.register_action::<ErrorAction>(ERROR_ACTION);
        }
        self
    }

    /// Sets the per-request deadline.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the container, for registrations after construction.
    pub fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    /// Appends a middleware stage run before routing on every request.
    pub fn use_middleware<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Registers routes under a path prefix.
    ///
    /// Routes keep their place in the global registration order.
    pub fn namespace<F>(&mut self, prefix: &str, f: F) -> TrellisResult<&mut Self>
    where
        F: FnOnce(&mut Namespace<'_>) -> TrellisResult<()>,
    {
        let mut namespace = Namespace {
            builder: self,
            prefix: join_prefix("", prefix),
        };
        f(&mut namespace)?;
        Ok(namespace.builder)
    }

    /// Finalizes the route table.
    ///
    /// Fails if no error action is registered.
    pub fn build(self) -> TrellisResult<Router> {
        let error_action = self.container.action_factory(ERROR_ACTION)?;
        describe_metrics();
        tracing::debug!(
            routes = self.routes.len(),
            middleware = self.middleware.len(),
            "router built"
        );
        Ok(Router::new(
            self.routes,
            self.middleware,
            Arc::new(self.container),
            Arc::new(self.defaults),
            error_action,
            self.timeout,
        ))
    }
}

impl RouteDsl for RouterBuilder {
    fn route_with(
        &mut self,
        method: Method,
        pattern: &str,
        action: &str,
        static_params: Params,
    ) -> TrellisResult<&mut Self> {
        let factory = self.container.action_factory(action)?;
        let compiled = RoutePattern::normalized(pattern).map_err(|e| {
            TrellisError::configuration(format!("invalid route pattern `{pattern}`: {e}"))
        })?;
        tracing::debug!(
            method = %method,
            pattern = compiled.source(),
            action,
            "registered route"
        );
        self.routes
            .push(Route::new(method, compiled, action, factory).with_static_params(static_params));
        Ok(self)
    }
}

/// A prefixed view of a [`RouterBuilder`], handed to
/// [`RouterBuilder::namespace`] callbacks.
pub struct Namespace<'a> {
    builder: &'a mut RouterBuilder,
    prefix: String,
}

impl fmt::Debug for Namespace<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl Namespace<'_> {
    /// Returns the full prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Opens a nested namespace.
    pub fn namespace<F>(&mut self, prefix: &str, f: F) -> TrellisResult<&mut Self>
    where
        F: FnOnce(&mut Namespace<'_>) -> TrellisResult<()>,
    {
        let mut nested = Namespace {
            builder: &mut *self.builder,
            prefix: join_prefix(&self.prefix, prefix),
        };
        f(&mut nested)?;
        Ok(self)
    }
}

impl RouteDsl for Namespace<'_> {
    fn route_with(
        &mut self,
        method: Method,
        pattern: &str,
        action: &str,
        static_params: Params,
    ) -> TrellisResult<&mut Self> {
        let pattern = join_prefix(&self.prefix, pattern);
        self.builder
            .route_with(method, &pattern, action, static_params)?;
        Ok(self)
    }
}

fn join_prefix(prefix: &str, pattern: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if pattern.is_empty() || pattern == "/" {
        return if prefix.is_empty() { "/".to_string() } else { prefix.to_string() };
    }
    if pattern.starts_with('/') || pattern.starts_with('(') {
        format!("{prefix}{pattern}")
    } else {
        format!("{prefix}/{pattern}")
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use trellis_action::{Action, ActionContext};
    use trellis_core::Payload;

    use super::*;

    #[derive(Default)]
    struct Noop;

    #[async_trait]
    impl Action for Noop {
        async fn respond(&mut self, _cx: &mut ActionContext) -> TrellisResult<Option<Payload>> {
            Ok(None)
        }
    }

    fn builder(actions: &[&str]) -> RouterBuilder {
        let mut container = Container::new();
        for action in actions {
            container.register_action::<Noop>(action);
        }
        RouterBuilder::new(container).with_standard_components()
    }

    #[test]
    fn test_join_prefix() {
        assert_eq!(join_prefix("", "/api"), "/api");
        assert_eq!(join_prefix("/api/", "/books"), "/api/books");
        assert_eq!(join_prefix("/api", "books"), "/api/books");
        assert_eq!(join_prefix("/api", "/"), "/api");
        assert_eq!(join_prefix("", "/"), "/");
    }

    #[test]
    fn test_unknown_action_is_configuration_error() {
        let mut builder = builder(&[]);
        let error = builder.get("/books", "books/list").unwrap_err();
        assert!(matches!(error, TrellisError::Configuration { .. }));
        assert!(error.detail().contains("action:books/list"));
    }

    #[test]
    fn test_invalid_pattern_is_configuration_error() {
        let mut builder = builder(&["broken"]);
        let error = builder.get("/books/:", "broken").unwrap_err();
        assert!(error.detail().contains("invalid route pattern"));
    }

    #[test]
    fn test_resource_registers_ten_routes() {
        let kinds = [
            "list",
            "create",
            "show",
            "update",
            "destroy",
            "related",
            "fetch-related",
            "replace-related",
            "add-related",
            "remove-related",
        ];
        let names: Vec<String> = kinds.iter().map(|kind| format!("books/{kind}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();

        let mut builder = builder(&refs);
        builder.resource("books", &ResourceOptions::new()).unwrap();
        let router = builder.build().unwrap();

        let actions: Vec<&str> = router.routes().iter().map(|route| route.action()).collect();
        assert_eq!(router.routes().len(), 10);
        for name in &refs {
            assert!(actions.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_resource_fails_on_first_missing_action() {
        let mut builder = builder(&["books/list"]);
        let error = builder
            .resource("books", &ResourceOptions::new().related(false))
            .unwrap_err();
        assert!(error.detail().contains("books/create"));
    }

    #[test]
    fn test_nested_namespaces_prefix_patterns() {
        let mut builder = builder(&["books/list", "health"]);
        builder.get("/health", "health").unwrap();
        builder
            .namespace("/api", |api| {
                api.namespace("v1", |v1| {
                    v1.get("/books", "books/list")?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap();
        builder.get("/books", "books/list").unwrap();

        let router = builder.build().unwrap();
        let patterns: Vec<&str> = router
            .routes()
            .routes(&Method::GET)
            .iter()
            .map(|route| route.pattern().source())
            .collect();
        assert_eq!(patterns, ["/health(/)", "/api/v1/books(/)", "/books(/)"]);
    }

    #[test]
    fn test_build_requires_error_action() {
        let builder = RouterBuilder::new(Container::new());
        assert!(builder.build().is_err());
    }

    #[test]
    fn test_configure_applies_config() {
        let mut config = TrellisConfig::development();
        config.server.request_timeout_ms = Some(250);
        config.serialization.default_serializer = "flat".to_string();

        let builder = RouterBuilder::new(Container::new()).configure(&config);
        assert_eq!(builder.timeout, Some(Duration::from_millis(250)));
        assert_eq!(builder.defaults.serializer, "flat");
        assert!(builder.defaults.expose_error_details);
    }

    #[test]
    fn test_standard_components_keep_existing_registrations() {
        let mut container = Container::new();
        container.register_serializer("application", FlatSerializer::default());
        let builder = RouterBuilder::new(container).with_standard_components();

        assert!(builder.container.serializer("json-api").is_some());
        assert!(builder.container.parser("application").is_ok());
        assert!(builder.container.action_factory(ERROR_ACTION).is_ok());
    }
}
