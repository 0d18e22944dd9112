use axum::{
    Form,
    extract::{Path, State, rejection::FormRejection},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use tracing::{debug, info};

use crate::{
    error::{AppError, AppResult},
    models::{
        DEFAULT_LIST_TITLE, DeleteItemForm, Item, NewItemForm, TodoList, is_default_list,
        normalize_list_name,
    },
    state::AppState,
    storage::StoreError,
    views,
};

pub async fn healthcheck() -> &'static str {
    "ok"
}

pub async fn about() -> Html<String> {
    Html(views::render_about())
}

/// `GET /` renders the default list, seeding it on the first visit.
pub async fn default_list(State(state): State<AppState>) -> AppResult<Response> {
    let items = state.repo.find_items().await?;

    if items.is_empty() {
        if state.repo.seed_default_items().await? {
            info!("saved default items");
        }
        return Ok(redirect_to("/".to_string()));
    }

    Ok(Html(views::render_list(DEFAULT_LIST_TITLE, &items)).into_response())
}

/// `GET /{list_name}` renders a custom list, creating it on the first visit.
pub async fn custom_list(
    State(state): State<AppState>,
    Path(raw_name): Path<String>,
) -> AppResult<Response> {
    show_list(&state, &raw_name).await
}

/// `GET /delete` is the page of the list named `Delete`; only `POST` deletes.
pub async fn delete_list_page(State(state): State<AppState>) -> AppResult<Response> {
    show_list(&state, "delete").await
}

async fn show_list(state: &AppState, raw_name: &str) -> AppResult<Response> {
    let name = normalize_list_name(raw_name);
    if name.trim().is_empty() {
        return Err(AppError::validation("list name must not be blank"));
    }

    match state.repo.find_list(&name).await? {
        Some(list) => Ok(Html(views::render_list(&list.name, &list.items)).into_response()),
        None => {
            match state.repo.insert_list(TodoList::seeded(name.clone())).await {
                Ok(()) => info!(list = %name, "created list"),
                // Another request created it first.
                Err(StoreError::DuplicateList(_)) => {}
                Err(err) => return Err(err.into()),
            }
            Ok(redirect_to(list_path(&name)))
        }
    }
}

/// `POST /` appends an item to the default list or a custom list.
pub async fn add_item(
    State(state): State<AppState>,
    payload: Result<Form<NewItemForm>, FormRejection>,
) -> AppResult<Response> {
    let Form(form) = payload.map_err(|rejection| AppError::validation(rejection.body_text()))?;
    let new_item = form.validate()?;
    let item = Item::new(new_item.name);

    if is_default_list(&new_item.list) {
        state.repo.insert_item(item).await?;
        return Ok(redirect_to("/".to_string()));
    }

    state.repo.push_item(&new_item.list, item).await?;
    Ok(redirect_to(list_path(&new_item.list)))
}

/// `POST /delete` removes an item by id. Unknown ids are a no-op.
pub async fn delete_item(
    State(state): State<AppState>,
    payload: Result<Form<DeleteItemForm>, FormRejection>,
) -> AppResult<Response> {
    let Form(form) = payload.map_err(|rejection| AppError::validation(rejection.body_text()))?;
    let target = form.validate()?;

    if is_default_list(&target.list) {
        if state.repo.delete_item(target.id).await? {
            info!(id = %target.id, "deleted checked item");
        }
        return Ok(redirect_to("/".to_string()));
    }

    let removed = state.repo.pull_item(&target.list, target.id).await?;
    debug!(list = %target.list, id = %target.id, removed, "pulled item");
    Ok(redirect_to(list_path(&target.list)))
}

fn redirect_to(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// `/` followed by `name` percent-encoded as a single path segment.
pub fn list_path(name: &str) -> String {
    let mut path = String::with_capacity(name.len() + 1);
    path.push('/');
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            path.push(char::from(byte));
        } else {
            path.push_str(&format!("%{byte:02X}"));
        }
    }
    path
}
