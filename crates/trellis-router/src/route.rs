//! Compiled routes and the per-method route table.

use std::fmt;

use http::Method;
use indexmap::IndexMap;

use crate::params::Params;
use crate::pattern::RoutePattern;

/// An immutable route: a compiled pattern bound to an HTTP method, an action
/// name and a resolved handler.
#[derive(Clone)]
pub struct Route<H> {
    method: Method,
    pattern: RoutePattern,
    action: String,
    handler: H,
    static_params: Params,
}

impl<H> Route<H> {
    /// Creates a route with no static parameters.
    pub fn new(method: Method, pattern: RoutePattern, action: impl Into<String>, handler: H) -> Self {
        Self {
            method,
            pattern,
            action: action.into(),
            handler,
            static_params: Params::new(),
        }
    }

    /// Binds static parameters that are merged into every match.
    #[must_use]
    pub fn with_static_params(mut self, params: Params) -> Self {
        self.static_params = params;
        self
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the compiled pattern.
    #[must_use]
    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    /// Returns the action name this route dispatches to.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Returns the resolved handler.
    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Returns the static parameters bound at registration.
    #[must_use]
    pub fn static_params(&self) -> &Params {
        &self.static_params
    }

    /// Matches a path. Captured values take precedence over static params.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<Params> {
        let captured = self.pattern.match_path(path)?;
        if self.static_params.is_empty() {
            return Some(captured);
        }
        let mut params = self.static_params.clone();
        params.merge(&captured);
        Some(params)
    }

    /// Renders a URL for this route.
    #[must_use]
    pub fn reverse(&self, data: &Params) -> Option<String> {
        self.pattern.reverse(data)
    }
}

impl<H> fmt::Debug for Route<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.source())
            .field("action", &self.action)
            .field("static_params", &self.static_params)
            .finish_non_exhaustive()
    }
}

/// Routes grouped by HTTP method.
///
/// Within a method, insertion order is match priority: the first route whose
/// pattern matches wins. Methods are kept in the order they were first used,
/// which is also the scan order for reverse lookups.
///
/// # Example
///
/// ```rust
/// use http::Method;
/// use trellis_router::{Route, RoutePattern, RouteTable};
///
/// let mut table = RouteTable::new();
/// table.push(Route::new(Method::GET, RoutePattern::normalized("/books/new").unwrap(), "books/new", ()));
/// table.push(Route::new(Method::GET, RoutePattern::normalized("/books/:id").unwrap(), "books/show", ()));
///
/// let (route, params) = table.match_route(&Method::GET, "/books/new").unwrap();
/// assert_eq!(route.action(), "books/new");
/// assert!(params.is_empty());
/// ```
#[derive(Clone)]
pub struct RouteTable<H> {
    methods: IndexMap<Method, Vec<Route<H>>>,
}

impl<H> Default for RouteTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> RouteTable<H> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            methods: IndexMap::new(),
        }
    }

    /// Appends a route to its method's list.
    pub fn push(&mut self, route: Route<H>) {
        self.methods
            .entry(route.method().clone())
            .or_default()
            .push(route);
    }

    /// Returns the first route for `method` matching `path`, with its params.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<(&Route<H>, Params)> {
        self.methods.get(method)?.iter().find_map(|route| {
            route.match_path(path).map(|params| (route, params))
        })
    }

    /// Returns the routes registered for a method, in priority order.
    #[must_use]
    pub fn routes(&self, method: &Method) -> &[Route<H>] {
        self.methods.get(method).map_or(&[][..], Vec::as_slice)
    }

    /// Iterates every route, method by method.
    pub fn iter(&self) -> impl Iterator<Item = &Route<H>> {
        self.methods.values().flatten()
    }

    /// Finds the first route bound to an action name.
    #[must_use]
    pub fn find_action(&self, action: &str) -> Option<&Route<H>> {
        self.iter().find(|route| route.action() == action)
    }

    /// Reverse lookup: renders a URL for the first route bound to `action`.
    ///
    /// Returns `None` if no route is bound to the action or a required
    /// parameter is missing.
    #[must_use]
    pub fn url_for(&self, action: &str, data: &Params) -> Option<String> {
        self.find_action(action)?.reverse(data)
    }

    /// Returns the total number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.values().map(Vec::len).sum()
    }

    /// Returns `true` if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<H> fmt::Debug for RouteTable<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(method: Method, pattern: &str, action: &str) -> Route<()> {
        Route::new(method, RoutePattern::normalized(pattern).unwrap(), action, ())
    }

    #[test]
    fn test_first_registered_match_wins() {
        let mut table = RouteTable::new();
        table.push(route(Method::GET, "/books/:id", "books/show"));
        table.push(route(Method::GET, "/books/featured", "books/featured"));

        let (matched, params) = table.match_route(&Method::GET, "/books/featured").unwrap();
        assert_eq!(matched.action(), "books/show");
        assert_eq!(params.get("id"), Some("featured"));
    }

    #[test]
    fn test_match_is_per_method() {
        let mut table = RouteTable::new();
        table.push(route(Method::GET, "/books", "books/list"));
        table.push(route(Method::POST, "/books", "books/create"));

        assert_eq!(
            table.match_route(&Method::POST, "/books").unwrap().0.action(),
            "books/create"
        );
        assert!(table.match_route(&Method::DELETE, "/books").is_none());
    }

    #[test]
    fn test_trailing_slash_equivalence() {
        let mut table = RouteTable::new();
        table.push(route(Method::GET, "/books/", "books/list"));

        assert!(table.match_route(&Method::GET, "/books").is_some());
        assert!(table.match_route(&Method::GET, "/books/").is_some());
    }

    #[test]
    fn test_static_params_are_merged() {
        let mut table = RouteTable::new();
        let static_params: Params = [("format", "csv"), ("id", "static")].into_iter().collect();
        table.push(route(Method::GET, "/export/:id", "export").with_static_params(static_params));

        let (_, params) = table.match_route(&Method::GET, "/export/12").unwrap();
        assert_eq!(params.get("format"), Some("csv"));
        assert_eq!(params.get("id"), Some("12"));
    }

    #[test]
    fn test_url_for_scans_methods_in_registration_order() {
        let mut table = RouteTable::new();
        table.push(route(Method::POST, "/v2/books/:id", "books/show"));
        table.push(route(Method::GET, "/books/:id", "books/show"));

        let data: Params = [("id", "4")].into_iter().collect();
        assert_eq!(table.url_for("books/show", &data).as_deref(), Some("/v2/books/4"));
        assert_eq!(table.url_for("books/missing", &data), None);
        assert_eq!(table.url_for("books/show", &Params::new()), None);
    }

    #[test]
    fn test_len_counts_all_methods() {
        let mut table = RouteTable::new();
        assert!(table.is_empty());
        table.push(route(Method::GET, "/a", "a"));
        table.push(route(Method::PUT, "/a", "a/put"));
        table.push(route(Method::GET, "/b", "b"));

        assert_eq!(table.len(), 3);
        assert_eq!(table.routes(&Method::GET).len(), 2);
        assert!(table.routes(&Method::HEAD).is_empty());
    }
}
