//! Pre-dispatch middleware.
//!
//! Middleware registered with [`RouterBuilder::use_middleware`] runs for every
//! request, in registration order, before routing. Each stage may inspect or
//! modify the request. The first stage to fail aborts the chain and the error
//! goes to the error action.
//!
//! [`RouterBuilder::use_middleware`]: crate::RouterBuilder::use_middleware

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use trellis_core::{Request, TrellisResult};

/// A pre-dispatch middleware stage.
///
/// # Example
///
/// ```
/// use futures_util::future::{BoxFuture, FutureExt};
/// use trellis_core::{Request, TrellisError, TrellisResult};
/// use trellis_server::Middleware;
///
/// struct RequireAccept;
///
/// impl Middleware for RequireAccept {
///     fn name(&self) -> &'static str {
///         "require-accept"
///     }
///
///     fn call<'a>(&'a self, request: &'a mut Request) -> BoxFuture<'a, TrellisResult<()>> {
///         async move {
///             if request.header("accept").is_none() {
///                 return Err(TrellisError::validation("missing accept header"));
///             }
///             Ok(())
///         }
///         .boxed()
///     }
/// }
/// ```
pub trait Middleware: Send + Sync + 'static {
    /// Returns the stage name, used in logs.
    fn name(&self) -> &'static str;

    /// Processes the request before it is routed.
    fn call<'a>(&'a self, request: &'a mut Request) -> BoxFuture<'a, TrellisResult<()>>;
}

/// Shared middleware handle.
pub type MiddlewareRef = Arc<dyn Middleware>;

/// Middleware built from a function.
///
/// # Example
///
/// ```
/// use futures_util::future::FutureExt;
/// use trellis_server::FnMiddleware;
///
/// let noop = FnMiddleware::new("noop", |_request| async { Ok(()) }.boxed());
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    f: F,
}

impl<F> FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut Request) -> BoxFuture<'a, TrellisResult<()>> + Send + Sync + 'static,
{
    /// Wraps a function as a named middleware stage.
    pub const fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut Request) -> BoxFuture<'a, TrellisResult<()>> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn call<'a>(&'a self, request: &'a mut Request) -> BoxFuture<'a, TrellisResult<()>> {
        (self.f)(request)
    }
}

/// Runs each stage in order, stopping at the first error.
pub(crate) async fn run_chain(chain: &[MiddlewareRef], request: &mut Request) -> TrellisResult<()> {
    for middleware in chain {
        tracing::trace!(middleware = middleware.name(), "running middleware");
        if let Err(error) = middleware.call(request).await {
            tracing::debug!(
                middleware = middleware.name(),
                error_code = error.error_code(),
                "middleware aborted the request"
            );
            return Err(error);
        }
    }
    Ok(())
}
