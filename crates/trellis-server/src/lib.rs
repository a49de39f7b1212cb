//! Request dispatch for Trellis.
//!
//! A [`RouterBuilder`] collects routes through the [`RouteDsl`] (verb methods,
//! `resource` and `namespace`) plus pre-dispatch [`Middleware`], then builds
//! an immutable [`Router`]. [`Router::handle`] implements dispatch:
//!
//! 1. run the middleware chain; the first error aborts it
//! 2. take the first route of the request's method whose pattern matches
//! 3. bind the matched route and params onto the request
//! 4. run a fresh action for the route
//! 5. hand any failure from steps 1 to 4 to the `error` action
//!
//! With a request deadline configured, steps 1 to 4 run under
//! `tokio::time::timeout`; on expiry the error action renders a `504`.
//!
//! # Example
//!
//! ```
//! # tokio_test::block_on(async {
//! use async_trait::async_trait;
//! use http::{Method, StatusCode};
//! use serde_json::json;
//! use trellis_action::{Action, ActionContext, ActionRegistry};
//! use trellis_config::TrellisConfig;
//! use trellis_core::{Container, Payload, Request, TrellisResult};
//! use trellis_server::{RouteDsl, RouterBuilder};
//!
//! #[derive(Default)]
//! struct ShowBook;
//!
//! #[async_trait]
//! impl Action for ShowBook {
//!     async fn respond(&mut self, cx: &mut ActionContext) -> TrellisResult<Option<Payload>> {
//!         let id = cx.request().params().get("id").unwrap_or_default().to_string();
//!         Ok(Some(Payload::from(json!({"id": id}))))
//!     }
//! }
//!
//! let mut container = Container::new();
//! container.register_action::<ShowBook>("books/show");
//!
//! let mut builder = RouterBuilder::new(container)
//!     .configure(&TrellisConfig::default())
//!     .with_standard_components();
//! builder.get("/books/:id", "books/show").unwrap();
//! let router = builder.build().unwrap();
//!
//! let response = router.handle(Request::new(Method::GET, "/books/42")).await.unwrap();
//! assert_eq!(response.status(), StatusCode::OK);
//!
//! let response = router.handle(Request::new(Method::GET, "/authors")).await.unwrap();
//! assert_eq!(response.status(), StatusCode::NOT_FOUND);
//! # });
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod builder;
mod middleware;
mod router;

pub use builder::{Namespace, RouteDsl, RouterBuilder};
pub use middleware::{FnMiddleware, Middleware, MiddlewareRef};
pub use router::Router;
