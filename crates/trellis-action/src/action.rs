//! The request handler contract.

use async_trait::async_trait;
use trellis_core::{Payload, TrellisResult};

use crate::chain::FilterLevel;
use crate::context::ActionContext;

/// Which parser turns the request into params.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserChoice {
    /// The application default parser.
    #[default]
    Application,
    /// A parser registered under `parser:{name}`.
    Named(&'static str),
    /// Skip parsing; params stay `null`.
    Skip,
}

/// A request handler.
///
/// A fresh value is created for every request. The lifecycle runs the
/// parser, the before-filters, [`respond`](Self::respond) and the
/// after-filters, then checks that something was rendered.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use serde_json::json;
/// use trellis_action::{Action, ActionContext};
/// use trellis_core::{Payload, TrellisResult};
///
/// #[derive(Default)]
/// struct Ping;
///
/// #[async_trait]
/// impl Action for Ping {
///     async fn respond(&mut self, _cx: &mut ActionContext) -> TrellisResult<Option<Payload>> {
///         Ok(Some(Payload::from(json!({"pong": true}))))
///     }
/// }
/// ```
#[async_trait]
pub trait Action: Send + Sync + Sized + 'static {
    /// Filter levels, root first. Defaults to no filters.
    fn levels() -> Vec<FilterLevel<Self>> {
        Vec::new()
    }

    /// The parser for this action type.
    fn parser() -> ParserChoice {
        ParserChoice::Application
    }

    /// The primary responder.
    ///
    /// Returning `Some` renders the payload with `200 OK` unless something
    /// was rendered already.
    async fn respond(&mut self, cx: &mut ActionContext) -> TrellisResult<Option<Payload>>;
}
