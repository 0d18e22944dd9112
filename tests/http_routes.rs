use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use todolist::{
    build_router, build_router_with_assets,
    models::{Item, ItemId, ListId, TodoList},
    repository::{DocumentStore, ListRepository},
    state::AppState,
    storage::{StoreError, StoreResult},
};
use tower::ServiceExt;

struct Reply {
    status: StatusCode,
    location: Option<String>,
    body: String,
}

fn app() -> (Router, Arc<DocumentStore>) {
    let store = Arc::new(DocumentStore::in_memory());
    (build_router(AppState::new(store.clone())), store)
}

async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("response expected");
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|value| value.to_str().expect("location is ascii").to_string());
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should be readable");

    Reply {
        status,
        location,
        body: String::from_utf8(body.to_vec()).expect("body should be utf-8"),
    }
}

async fn get(app: &Router, uri: &str) -> Reply {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    send(app, request).await
}

async fn post_form(app: &Router, uri: &str, form: &str) -> Reply {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .expect("request should build");
    send(app, request).await
}

fn names(items: &[Item]) -> Vec<&str> {
    items.iter().map(|item| item.name.as_str()).collect()
}

#[tokio::test]
async fn first_visit_to_root_seeds_defaults_and_redirects() {
    let (app, store) = app();

    let first = get(&app, "/").await;
    assert_eq!(first.status, StatusCode::FOUND);
    assert_eq!(first.location.as_deref(), Some("/"));

    let items = store.find_items().await.expect("items readable");
    assert_eq!(
        names(&items),
        vec![
            "Welcome to your todolist!",
            "Hit the + button to add a new item.",
            "<-- Hit this to delete an item.",
        ]
    );

    let second = get(&app, "/").await;
    assert_eq!(second.status, StatusCode::OK);
    assert!(second.body.contains("<h1>Today</h1>"));
    assert!(second.body.contains("Welcome to your todolist!"));
    assert!(second.body.contains("&lt;-- Hit this to delete an item."));

    get(&app, "/").await;
    assert_eq!(store.find_items().await.expect("items readable").len(), 3);
}

#[tokio::test]
async fn custom_list_is_created_once_under_its_normalized_name() {
    let (app, store) = app();

    let created = get(&app, "/work").await;
    assert_eq!(created.status, StatusCode::FOUND);
    assert_eq!(created.location.as_deref(), Some("/Work"));

    let first_id = store
        .find_list("Work")
        .await
        .expect("lookup works")
        .expect("list exists")
        .id;

    let shown = get(&app, "/Work").await;
    assert_eq!(shown.status, StatusCode::OK);
    assert!(shown.body.contains("<h1>Work</h1>"));

    let again = get(&app, "/work").await;
    assert_eq!(again.status, StatusCode::OK);

    let second_id = store
        .find_list("Work")
        .await
        .expect("lookup works")
        .expect("list exists")
        .id;
    assert_eq!(first_id, second_id);
    assert_eq!(store.list_names().await.expect("names"), vec!["Work"]);
}

#[tokio::test]
async fn only_the_first_letter_is_folded() {
    let (app, store) = app();

    get(&app, "/today").await;
    get(&app, "/Today").await;
    get(&app, "/TODAY").await;

    assert_eq!(
        store.list_names().await.expect("names"),
        vec!["Today", "TODAY"]
    );
}

#[tokio::test]
async fn list_names_with_spaces_redirect_to_an_encoded_path() {
    let (app, store) = app();

    let reply = get(&app, "/work%20stuff").await;
    assert_eq!(reply.status, StatusCode::FOUND);
    assert_eq!(reply.location.as_deref(), Some("/Work%20stuff"));
    assert!(store.find_list("Work stuff").await.expect("lookup").is_some());
}

#[tokio::test]
async fn adding_to_a_custom_list_appends_exactly_once() {
    let (app, store) = app();
    get(&app, "/groceries").await;

    let reply = post_form(&app, "/", "newItem=Buy+milk&list=Groceries").await;
    assert_eq!(reply.status, StatusCode::FOUND);
    assert_eq!(reply.location.as_deref(), Some("/Groceries"));

    let list = store
        .find_list("Groceries")
        .await
        .expect("lookup works")
        .expect("list exists");
    assert_eq!(list.items.len(), 4);
    assert_eq!(list.items[3].name, "Buy milk");
    assert_eq!(
        list.items.iter().filter(|item| item.name == "Buy milk").count(),
        1
    );

    let page = get(&app, "/Groceries").await;
    assert!(page.body.contains("Buy milk"));
}

#[tokio::test]
async fn adding_to_today_goes_to_the_default_collection() {
    let (app, store) = app();
    get(&app, "/").await;

    let reply = post_form(&app, "/", "newItem=Walk+the+dog&list=Today").await;
    assert_eq!(reply.status, StatusCode::FOUND);
    assert_eq!(reply.location.as_deref(), Some("/"));

    let items = store.find_items().await.expect("items readable");
    assert_eq!(items.len(), 4);
    assert_eq!(items[3].name, "Walk the dog");
}

#[tokio::test]
async fn adding_to_an_unknown_list_is_not_found() {
    let (app, store) = app();

    let reply = post_form(&app, "/", "newItem=Lost&list=Nowhere").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert!(reply.location.is_none());
    assert!(reply.body.contains("404 Not Found"));
    assert!(store.list_names().await.expect("names").is_empty());
}

#[tokio::test]
async fn missing_form_fields_are_bad_requests() {
    let (app, store) = app();

    let no_list = post_form(&app, "/", "newItem=Orphan").await;
    assert_eq!(no_list.status, StatusCode::BAD_REQUEST);

    let blank_item = post_form(&app, "/", "newItem=&list=Today").await;
    assert_eq!(blank_item.status, StatusCode::BAD_REQUEST);

    let no_id = post_form(&app, "/delete", "listName=Today").await;
    assert_eq!(no_id.status, StatusCode::BAD_REQUEST);

    let bad_id = post_form(&app, "/delete", "checkbox=42&listName=Today").await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);

    assert!(store.find_items().await.expect("items readable").is_empty());
}

#[tokio::test]
async fn non_form_bodies_are_bad_requests() {
    let (app, _store) = app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"newItem":"x","list":"Today"}"#))
        .expect("request should build");
    let reply = send(&app, request).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_from_a_custom_list_removes_exactly_that_item() {
    let (app, store) = app();
    get(&app, "/work").await;
    let before = store
        .find_list("Work")
        .await
        .expect("lookup works")
        .expect("list exists");
    let target = before.items[1].id;

    let reply = post_form(&app, "/delete", &format!("checkbox={target}&listName=Work")).await;
    assert_eq!(reply.status, StatusCode::FOUND);
    assert_eq!(reply.location.as_deref(), Some("/Work"));

    let after = store
        .find_list("Work")
        .await
        .expect("lookup works")
        .expect("list exists");
    assert_eq!(
        after.items,
        vec![before.items[0].clone(), before.items[2].clone()]
    );
}

#[tokio::test]
async fn deleting_an_unknown_id_is_a_successful_no_op() {
    let (app, store) = app();
    get(&app, "/work").await;
    let before = store.find_list("Work").await.expect("lookup works");

    let unknown = ItemId::new();
    let reply = post_form(&app, "/delete", &format!("checkbox={unknown}&listName=Work")).await;
    assert_eq!(reply.status, StatusCode::FOUND);
    assert_eq!(reply.location.as_deref(), Some("/Work"));
    assert_eq!(store.find_list("Work").await.expect("lookup works"), before);

    let missing_list =
        post_form(&app, "/delete", &format!("checkbox={unknown}&listName=Ghost")).await;
    assert_eq!(missing_list.status, StatusCode::FOUND);
    assert_eq!(missing_list.location.as_deref(), Some("/Ghost"));
}

#[tokio::test]
async fn deleting_from_today_uses_the_default_collection() {
    let (app, store) = app();
    get(&app, "/").await;
    let items = store.find_items().await.expect("items readable");

    let reply = post_form(
        &app,
        "/delete",
        &format!("checkbox={}&listName=Today", items[0].id),
    )
    .await;
    assert_eq!(reply.status, StatusCode::FOUND);
    assert_eq!(reply.location.as_deref(), Some("/"));

    let remaining = store.find_items().await.expect("items readable");
    assert_eq!(remaining, items[1..].to_vec());

    let again = post_form(
        &app,
        "/delete",
        &format!("checkbox={}&listName=Today", items[0].id),
    )
    .await;
    assert_eq!(again.status, StatusCode::FOUND);
    assert_eq!(store.find_items().await.expect("items readable").len(), 2);
}

#[tokio::test]
async fn about_page_is_static() {
    let (app, store) = app();

    let reply = get(&app, "/about").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("<h1>About</h1>"));
    assert!(store.list_names().await.expect("names").is_empty());
}

#[tokio::test]
async fn get_delete_opens_the_list_named_delete() {
    let (app, store) = app();

    let first = get(&app, "/delete").await;
    assert_eq!(first.status, StatusCode::FOUND);
    assert_eq!(first.location.as_deref(), Some("/Delete"));
    assert_eq!(store.list_names().await.expect("names"), vec!["Delete"]);

    let page = get(&app, "/delete").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("<h1>Delete</h1>"));

    // `/Delete` is the same list, served by the generic route.
    let same = get(&app, "/Delete").await;
    assert_eq!(same.status, StatusCode::OK);
    assert_eq!(store.list_names().await.expect("names"), vec!["Delete"]);
}

#[tokio::test]
async fn healthcheck_answers_ok() {
    let (app, _store) = app();
    let reply = get(&app, "/healthz").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "ok");
}

#[tokio::test]
async fn static_assets_are_served_from_the_public_dir() {
    let public = tempfile::tempdir().expect("temp dir");
    std::fs::create_dir_all(public.path().join("css")).expect("css dir");
    std::fs::write(public.path().join("css/styles.css"), "body { margin: 0; }")
        .expect("write css");

    let store = Arc::new(DocumentStore::in_memory());
    let app = build_router_with_assets(AppState::new(store), public.path());

    let reply = get(&app, "/css/styles.css").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "body { margin: 0; }");
}

struct BrokenRepository;

fn broken() -> StoreError {
    StoreError::Io {
        context: "reading journal",
        source: std::io::Error::other("disk on fire"),
    }
}

#[async_trait]
impl ListRepository for BrokenRepository {
    async fn find_items(&self) -> StoreResult<Vec<Item>> {
        Err(broken())
    }
    async fn find_item(&self, _id: ItemId) -> StoreResult<Option<Item>> {
        Err(broken())
    }
    async fn insert_items(&self, _items: Vec<Item>) -> StoreResult<()> {
        Err(broken())
    }
    async fn insert_item(&self, _item: Item) -> StoreResult<()> {
        Err(broken())
    }
    async fn delete_item(&self, _id: ItemId) -> StoreResult<bool> {
        Err(broken())
    }
    async fn seed_default_items(&self) -> StoreResult<bool> {
        Err(broken())
    }
    async fn find_list(&self, _name: &str) -> StoreResult<Option<TodoList>> {
        Err(broken())
    }
    async fn find_list_by_id(&self, _id: ListId) -> StoreResult<Option<TodoList>> {
        Err(broken())
    }
    async fn insert_list(&self, _list: TodoList) -> StoreResult<()> {
        Err(broken())
    }
    async fn update_list(&self, _list: TodoList) -> StoreResult<()> {
        Err(broken())
    }
    async fn push_item(&self, _list: &str, _item: Item) -> StoreResult<()> {
        Err(broken())
    }
    async fn pull_item(&self, _list: &str, _id: ItemId) -> StoreResult<bool> {
        Err(broken())
    }
    async fn list_names(&self) -> StoreResult<Vec<String>> {
        Err(broken())
    }
}

#[tokio::test]
async fn storage_failures_end_in_a_server_error() {
    let app = build_router(AppState::new(Arc::new(BrokenRepository)));

    let root = get(&app, "/").await;
    assert_eq!(root.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(root.body.contains("storage operation failed"));
    assert!(!root.body.contains("disk on fire"));

    let custom = get(&app, "/work").await;
    assert_eq!(custom.status, StatusCode::INTERNAL_SERVER_ERROR);

    let add = post_form(&app, "/", "newItem=x&list=Work").await;
    assert_eq!(add.status, StatusCode::INTERNAL_SERVER_ERROR);

    let delete = post_form(
        &app,
        "/delete",
        &format!("checkbox={}&listName=Today", ItemId::new()),
    )
    .await;
    assert_eq!(delete.status, StatusCode::INTERNAL_SERVER_ERROR);
}
