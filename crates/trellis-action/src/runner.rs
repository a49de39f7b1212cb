//! The action lifecycle.

use http::StatusCode;
use trellis_core::{TrellisError, TrellisResult};
use trellis_serializer::RenderOptions;

use crate::action::{Action, ParserChoice};
use crate::chain::{BoundFilter, FilterChain};
use crate::context::{ActionContext, Phase};
use crate::registry::ActionRegistry;

/// Runs an action to completion.
///
/// Phases run in order: parsing, before-filters, the responder,
/// after-filters. A filter that yields a payload renders it with `200 OK`
/// when nothing was rendered yet and ends its phase; the responder is
/// skipped once anything has rendered. After-filters always run. Finishing
/// without a render is a [`TrellisError::RenderOmitted`].
///
/// On failure the context is left in [`Phase::Error`].
pub async fn run<A: Action>(action: &mut A, cx: &mut ActionContext) -> TrellisResult<()> {
    let result = lifecycle(action, cx).await;
    match &result {
        Ok(()) => cx.enter(Phase::Rendered),
        Err(error) => {
            tracing::debug!(
                action = %cx.action(),
                phase = %cx.phase(),
                error_code = error.error_code(),
                "action failed"
            );
            cx.enter(Phase::Error);
        }
    }
    result
}

async fn lifecycle<A: Action>(action: &mut A, cx: &mut ActionContext) -> TrellisResult<()> {
    let chain = FilterChain::<A>::of()?;

    cx.enter(Phase::Parsing);
    let parser = match A::parser() {
        ParserChoice::Application => Some(cx.container().parser(&cx.defaults().parser)?),
        ParserChoice::Named(name) => Some(cx.container().parser(name)?),
        ParserChoice::Skip => None,
    };
    if let Some(parser) = parser {
        let params = parser.parse(cx.request()).await?;
        cx.set_params(params);
    }

    cx.enter(Phase::BeforeFilters);
    run_filters(chain.before(), action, cx).await?;

    cx.enter(Phase::Responding);
    if !cx.is_rendered() {
        if let Some(payload) = action.respond(cx).await? {
            if !cx.is_rendered() {
                cx.render(StatusCode::OK, Some(payload), RenderOptions::default())
                    .await?;
            }
        }
    }

    cx.enter(Phase::AfterFilters);
    run_filters(chain.after(), action, cx).await?;

    if cx.is_rendered() {
        Ok(())
    } else {
        Err(TrellisError::render_omitted(cx.action()))
    }
}

async fn run_filters<A: Action>(
    filters: &[BoundFilter<A>],
    action: &mut A,
    cx: &mut ActionContext,
) -> TrellisResult<()> {
    for filter in filters {
        let Some(payload) = filter.call(action, cx).await? else {
            continue;
        };
        tracing::debug!(
            action = %cx.action(),
            filter = filter.name(),
            phase = %cx.phase(),
            "filter halted the chain"
        );
        if !cx.is_rendered() {
            cx.render(StatusCode::OK, Some(payload), RenderOptions::default())
                .await?;
        }
        break;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use async_trait::async_trait;
    use futures_util::future::{BoxFuture, FutureExt};
    use http::Method;
    use serde_json::json;
    use trellis_core::{Container, ErrorCategory, Payload, Request};
    use trellis_serializer::{FlatSerializer, SerializerRegistry};

    use crate::chain::{FilterLevel, FilterResult};
    use crate::context::ActionDefaults;
    use crate::parser::JsonParser;

    #[derive(Default)]
    struct Log(Mutex<Vec<&'static str>>);

    impl Log {
        fn push(&self, entry: &'static str) {
            self.0.lock().unwrap().push(entry);
        }

        fn entries(&self) -> Vec<&'static str> {
            self.0.lock().unwrap().clone()
        }
    }

    fn context(container: Container) -> ActionContext {
        ActionContext::new(
            "books/list",
            Request::new(Method::GET, "/books"),
            Arc::new(container),
            Arc::new(ActionDefaults::default()),
        )
    }

    fn container() -> Container {
        let mut container = Container::new();
        container.register_serializer("application", FlatSerializer::default());
        container.register_parser("application", JsonParser);
        container
    }

    struct Gatekeeper {
        log: Arc<Log>,
    }

    impl Gatekeeper {
        fn deny<'a>(&'a mut self, _cx: &'a mut ActionContext) -> BoxFuture<'a, FilterResult> {
            async move {
                self.log.push("deny");
                Ok(Some(Payload::from(json!({"denied": true}))))
            }
            .boxed()
        }

        fn unreachable<'a>(&'a mut self, _cx: &'a mut ActionContext) -> BoxFuture<'a, FilterResult> {
            async move {
                self.log.push("unreachable");
                Ok(None)
            }
            .boxed()
        }

        fn audit<'a>(&'a mut self, cx: &'a mut ActionContext) -> BoxFuture<'a, FilterResult> {
            async move {
                assert!(cx.is_rendered());
                self.log.push("audit");
                Ok(None)
            }
            .boxed()
        }
    }

    #[async_trait]
    impl Action for Gatekeeper {
        fn levels() -> Vec<FilterLevel<Self>> {
            vec![FilterLevel::new("gatekeeper")
                .before(["deny", "unreachable"])
                .after(["audit"])
                .filter("deny", Self::deny)
                .filter("unreachable", Self::unreachable)
                .filter("audit", Self::audit)]
        }

        async fn respond(&mut self, _cx: &mut ActionContext) -> TrellisResult<Option<Payload>> {
            self.log.push("respond");
            Ok(Some(Payload::from(json!({"books": []}))))
        }
    }

    #[tokio::test]
    async fn test_before_filter_halts_but_after_filters_run() {
        let log = Arc::new(Log::default());
        let mut action = Gatekeeper { log: log.clone() };
        let mut cx = context(container());

        run(&mut action, &mut cx).await.unwrap();

        assert_eq!(log.entries(), ["deny", "audit"]);
        assert_eq!(cx.phase(), Phase::Rendered);
        assert_eq!(cx.response().status(), StatusCode::OK);
        assert_eq!(cx.response().json().unwrap(), json!({"denied": true}));
    }

    #[derive(Default)]
    struct Listing;

    #[async_trait]
    impl Action for Listing {
        async fn respond(&mut self, cx: &mut ActionContext) -> TrellisResult<Option<Payload>> {
            let page = cx.params()["query"]["page"].clone();
            Ok(Some(Payload::from(json!({"page": page}))))
        }
    }

    #[tokio::test]
    async fn test_responder_output_is_auto_rendered_with_parsed_params() {
        let mut cx = ActionContext::new(
            "books/list",
            Request::new(Method::GET, "/books?page=2"),
            Arc::new(container()),
            Arc::new(ActionDefaults::default()),
        );

        run(&mut Listing, &mut cx).await.unwrap();
        assert_eq!(cx.response().json().unwrap(), json!({"page": "2"}));
    }

    #[derive(Default)]
    struct Silent;

    #[async_trait]
    impl Action for Silent {
        fn parser() -> ParserChoice {
            ParserChoice::Skip
        }

        async fn respond(&mut self, _cx: &mut ActionContext) -> TrellisResult<Option<Payload>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_render_omission_is_an_error() {
        let mut cx = context(container());
        let err = run(&mut Silent, &mut cx).await.unwrap_err();

        assert!(matches!(err, TrellisError::RenderOmitted { .. }));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.detail(), "handler did not render anything");
        assert_eq!(cx.phase(), Phase::Error);
    }

    #[derive(Default)]
    struct Unguarded;

    impl Unguarded {
        fn noop<'a>(&'a mut self, _cx: &'a mut ActionContext) -> BoxFuture<'a, FilterResult> {
            async move { Ok(None) }.boxed()
        }
    }

    #[async_trait]
    impl Action for Unguarded {
        fn levels() -> Vec<FilterLevel<Self>> {
            vec![
                FilterLevel::new("application").before(["authenticate"]),
                FilterLevel::new("unguarded").after(["audit"]).filter("audit", Self::noop),
            ]
        }

        async fn respond(&mut self, _cx: &mut ActionContext) -> TrellisResult<Option<Payload>> {
            Ok(Some(Payload::from(json!({}))))
        }
    }

    #[tokio::test]
    async fn test_missing_filter_fails_on_first_request() {
        let mut cx = context(container());
        let err = run(&mut Unguarded, &mut cx).await.unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(!cx.is_rendered());
    }

    #[tokio::test]
    async fn test_missing_parser_is_configuration_error() {
        let mut container = Container::new();
        container.register_serializer("application", FlatSerializer::default());
        let mut cx = context(container);

        let err = run(&mut Listing, &mut cx).await.unwrap_err();
        assert!(err.detail().contains("parser:application"));
    }

    #[derive(Default)]
    struct Explicit;

    #[async_trait]
    impl Action for Explicit {
        async fn respond(&mut self, cx: &mut ActionContext) -> TrellisResult<Option<Payload>> {
            cx.render(StatusCode::CREATED, Some(json!({"id": 1}).into()), RenderOptions::new())
                .await?;
            Ok(Some(Payload::from(json!({"ignored": true}))))
        }
    }

    #[tokio::test]
    async fn test_explicit_render_wins_over_returned_payload() {
        let mut cx = context(container());
        run(&mut Explicit, &mut cx).await.unwrap();

        assert_eq!(cx.response().status(), StatusCode::CREATED);
        assert_eq!(cx.response().json().unwrap(), json!({"id": 1}));
    }
}
