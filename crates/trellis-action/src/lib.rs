//! Request handlers for Trellis.
//!
//! An [`Action`] handles one request. Its lifecycle is driven by
//! [`run`]:
//!
//! 1. the request is parsed into params by a [`Parser`]
//! 2. before-filters run in chain order
//! 3. the responder runs, unless something already rendered
//! 4. after-filters run, always
//! 5. if nothing rendered, the action fails with
//!    [`TrellisError::RenderOmitted`](trellis_core::TrellisError::RenderOmitted)
//!
//! Filters are declared per hierarchy level ([`FilterLevel`]) and resolved
//! once per action type into a cached [`FilterChain`].
//!
//! # Example
//!
//! ```
//! # tokio_test::block_on(async {
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use futures_util::future::{BoxFuture, FutureExt};
//! use http::{Method, StatusCode};
//! use serde_json::json;
//! use trellis_action::{
//!     run, Action, ActionContext, ActionDefaults, ActionRegistry, FilterLevel, FilterResult,
//!     JsonParser,
//! };
//! use trellis_core::{Container, Payload, Request, TrellisResult};
//! use trellis_serializer::{FlatSerializer, SerializerRegistry};
//!
//! #[derive(Default)]
//! struct ShowBook;
//!
//! impl ShowBook {
//!     fn require_id<'a>(&'a mut self, cx: &'a mut ActionContext) -> BoxFuture<'a, FilterResult> {
//!         async move {
//!             if cx.request().params().contains("id") {
//!                 Ok(None)
//!             } else {
//!                 Ok(Some(Payload::from(json!({"missing": "id"}))))
//!             }
//!         }
//!         .boxed()
//!     }
//! }
//!
//! #[async_trait]
//! impl Action for ShowBook {
//!     fn levels() -> Vec<FilterLevel<Self>> {
//!         vec![FilterLevel::new("show-book")
//!             .before(["require_id"])
//!             .filter("require_id", Self::require_id)]
//!     }
//!
//!     async fn respond(&mut self, _cx: &mut ActionContext) -> TrellisResult<Option<Payload>> {
//!         Ok(Some(Payload::from(json!({"title": "Dune"}))))
//!     }
//! }
//!
//! let mut container = Container::new();
//! container.register_serializer("application", FlatSerializer::default());
//! container.register_parser("application", JsonParser);
//!
//! let mut cx = ActionContext::new(
//!     "books/show",
//!     Request::new(Method::GET, "/books"),
//!     Arc::new(container),
//!     Arc::new(ActionDefaults::default()),
//! );
//! run(&mut ShowBook, &mut cx).await.unwrap();
//!
//! assert_eq!(cx.response().status(), StatusCode::OK);
//! assert_eq!(cx.response().json().unwrap(), json!({"missing": "id"}));
//! # });
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod action;
mod chain;
mod context;
mod error_action;
mod parser;
mod registry;
mod runner;
mod view;

pub use action::{Action, ParserChoice};
pub use chain::{BoundFilter, FilterChain, FilterFn, FilterLevel, FilterResult};
pub use context::{ActionContext, ActionDefaults, Phase};
pub use error_action::{ErrorAction, ERROR_ACTION};
pub use parser::{JsonApiParser, JsonParser, Parser, ParserRef};
pub use registry::{ActionFactory, ActionFactoryRef, ActionRegistry, ErasedAction, FnFactory};
pub use runner::run;
pub use view::{View, ViewRef};
