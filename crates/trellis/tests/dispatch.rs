//! End-to-end dispatch through `Router::handle`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt};
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{Method, StatusCode};
use serde_json::json;
use trellis::core::fixtures::MemoryRecord;
use trellis::prelude::*;
use trellis::serializer::{JSON_API_CONTENT_TYPE, JSON_CONTENT_TYPE};

/// Records which filters and responders ran, in order.
#[derive(Default)]
struct Journal(Mutex<Vec<&'static str>>);

impl Journal {
    fn push(&self, entry: &'static str) {
        self.0.lock().unwrap().push(entry);
    }

    fn entries(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }
}

/// Echoes the action it was dispatched to and the bound params.
#[derive(Default)]
struct Echo;

#[async_trait]
impl Action for Echo {
    async fn respond(&mut self, cx: &mut ActionContext) -> TrellisResult<Option<Payload>> {
        let params: serde_json::Map<String, serde_json::Value> = cx
            .request()
            .params()
            .iter()
            .map(|(name, value)| (name.to_string(), json!(value)))
            .collect();
        Ok(Some(Payload::from(json!({
            "action": cx.action(),
            "params": params,
        }))))
    }
}

const BOOK_ACTIONS: [&str; 10] = [
    "books/list",
    "books/create",
    "books/show",
    "books/update",
    "books/destroy",
    "books/related",
    "books/fetch-related",
    "books/replace-related",
    "books/add-related",
    "books/remove-related",
];

fn flat_config() -> TrellisConfig {
    let mut config = TrellisConfig::default();
    config.serialization.default_serializer = "flat".to_string();
    config.server.expose_error_details = true;
    config
}

#[tokio::test]
async fn test_resource_routes_dispatch_to_conventional_actions() {
    let mut container = Container::new();
    for action in BOOK_ACTIONS {
        container.register_action::<Echo>(action);
    }
    let mut builder = RouterBuilder::new(container)
        .configure(&flat_config())
        .with_standard_components();
    builder.resource("books", &ResourceOptions::new()).unwrap();
    let router = builder.build().unwrap();
    assert_eq!(router.routes().len(), 10);

    let cases = [
        (Method::GET, "/books", "books/list"),
        (Method::POST, "/books", "books/create"),
        (Method::GET, "/books/1", "books/show"),
        (Method::PATCH, "/books/1", "books/update"),
        (Method::DELETE, "/books/1", "books/destroy"),
        (Method::GET, "/books/1/author", "books/related"),
        (Method::GET, "/books/1/relationships/author", "books/fetch-related"),
        (Method::PATCH, "/books/1/relationships/author", "books/replace-related"),
        (Method::POST, "/books/1/relationships/author", "books/add-related"),
        (Method::DELETE, "/books/1/relationships/author", "books/remove-related"),
    ];
    for (method, path, expected) in cases {
        let response = router.handle(Request::new(method.clone(), path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{method} {path}");
        assert_eq!(response.json().unwrap()["action"], expected, "{method} {path}");
    }

    let response = router
        .handle(Request::new(Method::GET, "/books/1/relationships/author"))
        .await
        .unwrap();
    assert_eq!(
        response.json().unwrap()["params"],
        json!({"id": "1", "relation": "author"})
    );
}

#[derive(Default)]
struct ShowBook;

#[async_trait]
impl Action for ShowBook {
    async fn respond(&mut self, _cx: &mut ActionContext) -> TrellisResult<Option<Payload>> {
        let book = MemoryRecord::new("book", 1)
            .with_attribute("title", "foo")
            .with_attribute("content", "bar")
            .into_ref();
        Ok(Some(Payload::record(book)))
    }
}

#[tokio::test]
async fn test_flat_serializer_whitelists_attributes() {
    let mut container = Container::new();
    container.register_action::<ShowBook>("books/show");
    container.register_serializer("book", FlatSerializer::new(Schema::new().attributes(["title"])));
    let mut builder = RouterBuilder::new(container)
        .configure(&flat_config())
        .with_standard_components();
    builder.get("/books/:id", "books/show").unwrap();
    let router = builder.build().unwrap();

    let response = router.handle(Request::new(Method::GET, "/books/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.header(CONTENT_TYPE.as_str()), Some(JSON_CONTENT_TYPE));
    assert_eq!(response.json().unwrap(), json!({"id": 1, "title": "foo"}));
}

#[derive(Default)]
struct ListPosts;

#[async_trait]
impl Action for ListPosts {
    async fn respond(&mut self, _cx: &mut ActionContext) -> TrellisResult<Option<Payload>> {
        let comment = |id: u64, body: &str| -> RecordRef {
            MemoryRecord::new("comment", id)
                .with_attribute("body", body)
                .into_ref()
        };
        let post = |id: u64, comments: Vec<RecordRef>| -> RecordRef {
            let post = MemoryRecord::new("post", id)
                .with_attribute("title", format!("post {id}"))
                .has_many("comments")
                .into_ref();
            post.set_many("comments", comments);
            post
        };

        let shared = comment(10, "shared");
        Ok(Some(Payload::records([
            post(1, vec![shared.clone(), comment(11, "first only")]),
            post(2, vec![shared]),
        ])))
    }
}

#[tokio::test]
async fn test_json_api_includes_shared_comment_once() {
    let mut container = Container::new();
    container.register_action::<ListPosts>("posts/list");
    container.register_serializer(
        "post",
        JsonApiSerializer::new(
            Schema::new()
                .attributes(["title"])
                .relationship("comments", RelationshipConfig::embed()),
        ),
    );
    container.register_serializer(
        "comment",
        JsonApiSerializer::new(Schema::new().attributes(["body"])),
    );
    let mut builder = RouterBuilder::new(container)
        .configure(&TrellisConfig::default())
        .with_standard_components();
    builder.get("/posts", "posts/list").unwrap();
    let router = builder.build().unwrap();

    let response = router.handle(Request::new(Method::GET, "/posts")).await.unwrap();
    assert_eq!(response.header(CONTENT_TYPE.as_str()), Some(JSON_API_CONTENT_TYPE));

    let body = response.json().unwrap();
    assert_eq!(
        body["data"][0]["relationships"]["comments"]["data"],
        json!([{"type": "comments", "id": "10"}, {"type": "comments", "id": "11"}])
    );
    assert_eq!(
        body["data"][1]["relationships"]["comments"]["data"],
        json!([{"type": "comments", "id": "10"}])
    );
    let included = body["included"].as_array().unwrap();
    let keys: Vec<(&str, &str)> = included
        .iter()
        .map(|resource| {
            (
                resource["type"].as_str().unwrap(),
                resource["id"].as_str().unwrap(),
            )
        })
        .collect();
    assert_eq!(keys, [("comments", "10"), ("comments", "11")]);
    assert_eq!(body["jsonapi"], json!({"version": "1.0"}));
    assert!(body.get("errors").is_none());
}

/// Declares `authenticate` without defining it.
#[derive(Default)]
struct Unguarded;

#[async_trait]
impl Action for Unguarded {
    fn levels() -> Vec<FilterLevel<Self>> {
        vec![FilterLevel::new("unguarded").before(["authenticate"])]
    }

    async fn respond(&mut self, _cx: &mut ActionContext) -> TrellisResult<Option<Payload>> {
        Ok(Some(Payload::from(json!({"reached": true}))))
    }
}

#[tokio::test]
async fn test_undefined_filter_fails_at_first_request() {
    let mut container = Container::new();
    container.register_action::<Unguarded>("unguarded");
    let mut config = TrellisConfig::default();
    config.server.expose_error_details = true;
    let mut builder = RouterBuilder::new(container)
        .configure(&config)
        .with_standard_components();
    builder.get("/unguarded", "unguarded").unwrap();
    let router = builder.build().unwrap();

    let response = router.handle(Request::new(Method::GET, "/unguarded")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json().unwrap();
    let detail = body["errors"][0]["detail"].as_str().unwrap();
    assert!(detail.contains("authenticate"), "{detail}");
    assert!(body.get("data").is_none());
}

/// Two hierarchy levels: an application level shared by all actions and a
/// books level that adds its own filters.
#[derive(Default)]
struct GuardedBooks;

impl GuardedBooks {
    fn journal(cx: &ActionContext) -> TrellisResult<Arc<Journal>> {
        cx.service::<Journal>()
    }

    fn authenticate<'a>(&'a mut self, cx: &'a mut ActionContext) -> BoxFuture<'a, FilterResult> {
        async move {
            Self::journal(cx)?.push("authenticate");
            if cx.request().header("authorization").is_some() {
                Ok(None)
            } else {
                Ok(Some(Payload::from(json!({"error": "sign in first"}))))
            }
        }
        .boxed()
    }

    fn load_book<'a>(&'a mut self, cx: &'a mut ActionContext) -> BoxFuture<'a, FilterResult> {
        async move {
            Self::journal(cx)?.push("load_book");
            Ok(None)
        }
        .boxed()
    }

    fn audit<'a>(&'a mut self, cx: &'a mut ActionContext) -> BoxFuture<'a, FilterResult> {
        async move {
            Self::journal(cx)?.push("audit");
            Ok(None)
        }
        .boxed()
    }
}

#[async_trait]
impl Action for GuardedBooks {
    fn levels() -> Vec<FilterLevel<Self>> {
        vec![
            FilterLevel::new("application")
                .before(["authenticate"])
                .after(["audit"])
                .filter("authenticate", Self::authenticate)
                .filter("audit", Self::audit),
            FilterLevel::new("books")
                .before(["authenticate", "load_book"])
                .filter("load_book", Self::load_book),
        ]
    }

    async fn respond(&mut self, cx: &mut ActionContext) -> TrellisResult<Option<Payload>> {
        Self::journal(cx)?.push("respond");
        Ok(Some(Payload::from(json!({"title": "Dune"}))))
    }
}

fn guarded_router(journal: Arc<Journal>) -> Router {
    let mut container = Container::new();
    container.register(journal);
    container.register_action::<GuardedBooks>("books/show");
    let mut builder = RouterBuilder::new(container)
        .configure(&flat_config())
        .with_standard_components();
    builder.get("/books/:id", "books/show").unwrap();
    builder.build().unwrap()
}

#[tokio::test]
async fn test_before_filter_halts_but_after_filters_run() {
    let journal = Arc::new(Journal::default());
    let router = guarded_router(Arc::clone(&journal));

    let response = router.handle(Request::new(Method::GET, "/books/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.json().unwrap(), json!({"error": "sign in first"}));
    assert_eq!(journal.entries(), ["authenticate", "audit"]);
}

#[tokio::test]
async fn test_inherited_filters_run_once_in_declaration_order() {
    let journal = Arc::new(Journal::default());
    let router = guarded_router(Arc::clone(&journal));

    let request = Request::new(Method::GET, "/books/1").with_header(
        HeaderName::from_static("authorization"),
        HeaderValue::from_static("Bearer token"),
    );
    let response = router.handle(request).await.unwrap();
    assert_eq!(response.json().unwrap(), json!({"title": "Dune"}));
    assert_eq!(
        journal.entries(),
        ["authenticate", "load_book", "respond", "audit"]
    );
}

#[derive(Default)]
struct Forgetful;

#[async_trait]
impl Action for Forgetful {
    async fn respond(&mut self, _cx: &mut ActionContext) -> TrellisResult<Option<Payload>> {
        Ok(None)
    }
}

#[tokio::test]
async fn test_render_omission_and_routing_errors_are_rendered() {
    let mut container = Container::new();
    container.register_action::<Forgetful>("forgetful");
    let mut builder = RouterBuilder::new(container)
        .configure(&TrellisConfig::default())
        .with_standard_components();
    builder.get("/forgetful", "forgetful").unwrap();
    let router = builder.build().unwrap();

    let response = router.handle(Request::new(Method::GET, "/forgetful")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json().unwrap();
    assert_eq!(body["errors"][0]["status"], "500");
    assert_eq!(body["errors"][0]["detail"], "internal server error");

    let response = router.handle(Request::new(Method::GET, "/nowhere")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response.json().unwrap();
    assert_eq!(body["errors"][0]["status"], "404");
    assert_eq!(body["errors"][0]["detail"], "no route matches GET /nowhere");
}

#[derive(Default)]
struct Stalled;

#[async_trait]
impl Action for Stalled {
    async fn respond(&mut self, _cx: &mut ActionContext) -> TrellisResult<Option<Payload>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Some(Payload::from(json!("too late"))))
    }
}

#[tokio::test(start_paused = true)]
async fn test_request_deadline_renders_gateway_timeout() {
    let mut container = Container::new();
    container.register_action::<Stalled>("stalled");
    let mut config = TrellisConfig::default();
    config.server.request_timeout_ms = Some(100);
    let mut builder = RouterBuilder::new(container)
        .configure(&config)
        .with_standard_components();
    builder.get("/stalled", "stalled").unwrap();
    let router = builder.build().unwrap();

    let response = router.handle(Request::new(Method::GET, "/stalled")).await.unwrap();
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(response.json().unwrap()["errors"][0]["status"], "504");
}

#[tokio::test]
async fn test_url_for_and_namespaces() {
    let mut container = Container::new();
    for action in BOOK_ACTIONS {
        container.register_action::<Echo>(action);
    }
    let mut builder = RouterBuilder::new(container)
        .configure(&flat_config())
        .with_standard_components();
    builder
        .namespace("/api", |api| {
            api.resource("books", &ResourceOptions::new())?;
            Ok(())
        })
        .unwrap();
    let router = builder.build().unwrap();

    let params: Params = [("id", "9"), ("relation", "author")].into_iter().collect();
    assert_eq!(
        router.url_for("books/show", &params).as_deref(),
        Some("/api/books/9")
    );
    assert_eq!(
        router.url_for("books/fetch-related", &params).as_deref(),
        Some("/api/books/9/relationships/author")
    );
    assert!(router.url_for("books/show", &Params::new()).is_none());
    assert!(router.url_for("authors/show", &params).is_none());

    let response = router
        .handle(Request::new(Method::GET, "/api/books/9/"))
        .await
        .unwrap();
    assert_eq!(response.json().unwrap()["action"], "books/show");
}

#[derive(Default)]
struct CreateBook;

#[async_trait]
impl Action for CreateBook {
    fn parser() -> ParserChoice {
        ParserChoice::Named("json-api")
    }

    async fn respond(&mut self, cx: &mut ActionContext) -> TrellisResult<Option<Payload>> {
        let body = cx.params()["body"].clone();
        cx.render(
            StatusCode::CREATED,
            Some(Payload::from(body)),
            RenderOptions::new().serializer("flat"),
        )
        .await?;
        Ok(None)
    }
}

#[tokio::test]
async fn test_json_api_request_body_is_parsed() {
    let mut container = Container::new();
    container.register_action::<CreateBook>("books/create");
    let mut builder = RouterBuilder::new(container)
        .configure(&TrellisConfig::default())
        .with_standard_components();
    builder.post("/books", "books/create").unwrap();
    let router = builder.build().unwrap();

    let request = Request::new(Method::POST, "/books").with_json(
        JSON_API_CONTENT_TYPE,
        &json!({
            "data": {
                "type": "books",
                "attributes": {"title": "Dune", "published-at": "1965"}
            }
        }),
    );
    let response = router.handle(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response.json().unwrap();
    assert_eq!(body["type"], "books");
    assert_eq!(body["title"], "Dune");
    assert_eq!(body["publishedAt"], "1965");

    let request = Request::new(Method::POST, "/books").with_body("{not json");
    let response = router.handle(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
