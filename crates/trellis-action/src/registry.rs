//! Action factories and container registration for actions, parsers and views.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use trellis_core::{Container, InjectionError, TrellisResult};

use crate::action::Action;
use crate::context::ActionContext;
use crate::parser::{Parser, ParserRef};
use crate::runner;
use crate::view::{View, ViewRef};

/// An action with its concrete type erased.
#[async_trait]
pub trait ErasedAction: Send {
    /// Runs the full lifecycle against `cx`.
    async fn run(&mut self, cx: &mut ActionContext) -> TrellisResult<()>;
}

#[async_trait]
impl<A: Action> ErasedAction for A {
    async fn run(&mut self, cx: &mut ActionContext) -> TrellisResult<()> {
        runner::run(self, cx).await
    }
}

/// Creates a fresh action per request.
pub trait ActionFactory: Send + Sync {
    /// Creates an action.
    fn create(&self) -> Box<dyn ErasedAction>;
}

/// Shared handle to a factory, as stored in the container.
pub type ActionFactoryRef = Arc<dyn ActionFactory>;

/// An [`ActionFactory`] backed by a constructor function.
pub struct FnFactory<F, A> {
    constructor: F,
    _action: PhantomData<fn() -> A>,
}

impl<F, A> FnFactory<F, A>
where
    F: Fn() -> A + Send + Sync + 'static,
    A: Action,
{
    /// Wraps a constructor.
    pub const fn new(constructor: F) -> Self {
        Self {
            constructor,
            _action: PhantomData,
        }
    }
}

impl<F, A> ActionFactory for FnFactory<F, A>
where
    F: Fn() -> A + Send + Sync + 'static,
    A: Action,
{
    fn create(&self) -> Box<dyn ErasedAction> {
        Box::new((self.constructor)())
    }
}

impl<F, A> fmt::Debug for FnFactory<F, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FnFactory")
            .field(&std::any::type_name::<A>())
            .finish()
    }
}

/// Registration of actions (`action:{name}`), parsers (`parser:{name}`) and
/// views (`view:{name}`) on the [`Container`].
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use trellis_action::{Action, ActionContext, ActionRegistry, JsonParser};
/// use trellis_core::{Container, Payload, TrellisResult};
///
/// #[derive(Default)]
/// struct Index;
///
/// #[async_trait]
/// impl Action for Index {
///     async fn respond(&mut self, _cx: &mut ActionContext) -> TrellisResult<Option<Payload>> {
///         Ok(None)
///     }
/// }
///
/// let mut container = Container::new();
/// container.register_action::<Index>("index");
/// container.register_parser("application", JsonParser);
///
/// assert!(container.action_factory("index").is_ok());
/// assert!(container.action_factory("missing").is_err());
/// assert!(container.parser("application").is_ok());
/// ```
pub trait ActionRegistry {
    /// Registers an action constructed with `Default`.
    fn register_action<A: Action + Default>(&mut self, name: &str) {
        self.register_action_with(name, A::default);
    }

    /// Registers an action with a constructor.
    fn register_action_with<A, F>(&mut self, name: &str, constructor: F)
    where
        A: Action,
        F: Fn() -> A + Send + Sync + 'static;

    /// Strict lookup of an action factory.
    fn action_factory(&self, name: &str) -> Result<ActionFactoryRef, InjectionError>;

    /// Registers a parser.
    fn register_parser<P: Parser + 'static>(&mut self, name: &str, parser: P);

    /// Strict lookup of a parser.
    fn parser(&self, name: &str) -> Result<ParserRef, InjectionError>;

    /// Registers a view.
    fn register_view<V: View + 'static>(&mut self, name: &str, view: V);

    /// Strict lookup of a view.
    fn view(&self, name: &str) -> Result<ViewRef, InjectionError>;
}

impl ActionRegistry for Container {
    fn register_action_with<A, F>(&mut self, name: &str, constructor: F)
    where
        A: Action,
        F: Fn() -> A + Send + Sync + 'static,
    {
        let factory: ActionFactoryRef = Arc::new(FnFactory::new(constructor));
        self.register_named(format!("action:{name}"), factory);
    }

    fn action_factory(&self, name: &str) -> Result<ActionFactoryRef, InjectionError> {
        self.lookup_required(&format!("action:{name}"))
    }

    fn register_parser<P: Parser + 'static>(&mut self, name: &str, parser: P) {
        let parser: ParserRef = Arc::new(parser);
        self.register_named(format!("parser:{name}"), parser);
    }

    fn parser(&self, name: &str) -> Result<ParserRef, InjectionError> {
        self.lookup_required(&format!("parser:{name}"))
    }

    fn register_view<V: View + 'static>(&mut self, name: &str, view: V) {
        let view: ViewRef = Arc::new(view);
        self.register_named(format!("view:{name}"), view);
    }

    fn view(&self, name: &str) -> Result<ViewRef, InjectionError> {
        self.lookup_required(&format!("view:{name}"))
    }
}
