//! Route matching for Trellis.
//!
//! This crate holds the routing primitives the dispatcher is built on:
//!
//! - **Patterns**: path templates with `:param` segments, `*splat` wildcards
//!   and `(optional)` groups, compiled to anchored regular expressions
//! - **Route tables**: per-method, ordered lists where the first registered
//!   match wins
//! - **Reverse routing**: rendering a URL back from an action name and a set
//!   of parameters
//! - **Resources**: the conventional ten-route expansion of a resource name
//!
//! # Example
//!
//! ```rust
//! use http::Method;
//! use trellis_router::{expand, Params, ResourceOptions, Route, RoutePattern, RouteTable};
//!
//! let mut table = RouteTable::new();
//! for route in expand("books", &ResourceOptions::new()) {
//!     let pattern = RoutePattern::normalized(&route.pattern).unwrap();
//!     table.push(Route::new(route.method, pattern, route.action, ()));
//! }
//!
//! let (route, params) = table.match_route(&Method::GET, "/books/7/author").unwrap();
//! assert_eq!(route.action(), "books/related");
//! assert_eq!(params.get("relation"), Some("author"));
//!
//! let data: Params = [("id", "7")].into_iter().collect();
//! assert_eq!(table.url_for("books/show", &data).as_deref(), Some("/books/7"));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod params;
mod pattern;
mod resource;
mod route;

pub use params::Params;
pub use pattern::{normalize, PatternError, RoutePattern};
pub use resource::{expand, ResourceAction, ResourceOptions, ResourceRoute, UnknownResourceAction};
pub use route::{Route, RouteTable};
