//! Request dispatch.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::Instrument;
use trellis_action::{ActionContext, ActionDefaults, ActionFactoryRef, ERROR_ACTION};
use trellis_core::{
    Container, MatchedRoute, Params, Request, Response, TrellisError, TrellisResult,
};
use trellis_router::RouteTable;
use trellis_telemetry::metrics::{record_request, InFlightGuard};

use crate::middleware::{run_chain, MiddlewareRef};

/// An immutable, fully resolved route table plus the dispatch algorithm.
///
/// Built by [`RouterBuilder`](crate::RouterBuilder). Cheap to share behind an
/// [`Arc`]; [`handle`](Self::handle) takes `&self`.
pub struct Router {
    routes: RouteTable<ActionFactoryRef>,
    middleware: Vec<MiddlewareRef>,
    container: Arc<Container>,
    defaults: Arc<ActionDefaults>,
    error_action: ActionFactoryRef,
    timeout: Option<Duration>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.len())
            .field("middleware", &self.middleware.len())
            .field("defaults", &self.defaults)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Why dispatch stopped short of a response.
struct Failure {
    action: Option<String>,
    error: TrellisError,
}

impl Router {
    pub(crate) fn new(
        routes: RouteTable<ActionFactoryRef>,
        middleware: Vec<MiddlewareRef>,
        container: Arc<Container>,
        defaults: Arc<ActionDefaults>,
        error_action: ActionFactoryRef,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            routes,
            middleware,
            container,
            defaults,
            error_action,
            timeout,
        }
    }

    /// Returns the route table.
    #[must_use]
    pub const fn routes(&self) -> &RouteTable<ActionFactoryRef> {
        &self.routes
    }

    /// Returns the container actions resolve services from.
    #[must_use]
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Returns the per-request deadline, if any.
    #[must_use]
    pub const fn request_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Renders a URL for the first route bound to `action`.
    ///
    /// Methods are scanned in the order they were first registered. Returns
    /// `None` if no route is bound to the action or a required parameter is
    /// missing from `data`.
    #[must_use]
    pub fn url_for(&self, action: &str, data: &Params) -> Option<String> {
        self.routes.url_for(action, data)
    }

    /// Dispatches a request.
    ///
    /// Middleware runs first, then the first route matching the request's
    /// method and path is bound and a fresh action runs. Any failure on that
    /// path, including an expired deadline, is rendered by the `error`
    /// action. An `Err` is returned only if the error action itself fails.
    pub async fn handle(&self, request: Request) -> TrellisResult<Response> {
        let started = Instant::now();
        let _in_flight = InFlightGuard::enter();
        let span = tracing::info_span!(
            "request",
            request_id = %request.id(),
            method = %request.method(),
            path = %request.path(),
        );

        async move {
            let mut request = request;
            let outcome = match self.timeout {
                Some(limit) => {
                    match tokio::time::timeout(limit, self.dispatch(&mut request)).await {
                        Ok(outcome) => outcome,
                        Err(_) => Err(Failure {
                            action: request.route().map(|route| route.action.clone()),
                            error: TrellisError::timeout(format!(
                                "request did not complete within {}ms",
                                limit.as_millis()
                            )),
                        }),
                    }
                }
                None => self.dispatch(&mut request).await,
            };

            let (action, result) = match outcome {
                Ok((action, response)) => (action, Ok(response)),
                Err(failure) => {
                    let action = failure.action.unwrap_or_else(|| ERROR_ACTION.to_string());
                    (action, self.recover(request, failure.error).await)
                }
            };

            let elapsed = started.elapsed();
            match &result {
                Ok(response) => {
                    record_request(&action, response.status().as_u16(), elapsed);
                    tracing::info!(
                        action = %action,
                        http.status_code = response.status().as_u16(),
                        duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                        "request completed"
                    );
                }
                Err(error) => {
                    record_request(&action, error.status_code().as_u16(), elapsed);
                    tracing::error!(
                        action = %action,
                        error_code = error.error_code(),
                        error = %error,
                        "error action failed"
                    );
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, request: &mut Request) -> Result<(String, Response), Failure> {
        run_chain(&self.middleware, request)
            .await
            .map_err(|error| Failure {
                action: None,
                error,
            })?;

        let (route, params) = self
            .routes
            .match_route(request.method(), request.path())
            .ok_or_else(|| Failure {
                action: None,
                error: TrellisError::route_not_found(request.method(), request.path()),
            })?;

        let action = route.action().to_string();
        request.bind_route(
            MatchedRoute {
                method: route.method().clone(),
                pattern: route.pattern().source().to_string(),
                action: action.clone(),
            },
            params,
        );
        tracing::debug!(action = %action, "route matched");

        let mut cx = ActionContext::new(
            action.clone(),
            request.clone(),
            Arc::clone(&self.container),
            Arc::clone(&self.defaults),
        );
        let mut handler = route.handler().create();
        match handler.run(&mut cx).await {
            Ok(()) => Ok((action, cx.into_parts().1)),
            Err(error) => Err(Failure {
                action: Some(action),
                error,
            }),
        }
    }

    async fn recover(&self, mut request: Request, error: TrellisError) -> TrellisResult<Response> {
        tracing::warn!(
            error_code = error.error_code(),
            http.status_code = error.status_code().as_u16(),
            "dispatch failed, running error action"
        );
        request.set_error(Arc::new(error));

        let mut cx = ActionContext::new(
            ERROR_ACTION,
            request,
            Arc::clone(&self.container),
            Arc::clone(&self.defaults),
        );
        let mut handler = self.error_action.create();
        handler.run(&mut cx).await?;
        Ok(cx.into_parts().1)
    }
}
